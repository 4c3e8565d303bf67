//! Object Cache: a thread-scoped, tag-keyed weak-reference registry so
//! repeated construction with the same `tag` hands back the same client
//! instance instead of opening a fresh set of connections.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::client::{ClientInner, FederatedClient};

thread_local! {
    /// Scoped to the thread running the `LocalSet`, since `ClientInner` is
    /// `!Send`: a process-wide registry could never safely hand an entry
    /// back to a different thread anyway.
    static REGISTRY: RefCell<HashMap<String, Weak<RefCell<ClientInner>>>> =
        RefCell::new(HashMap::new());
}

/// Look up a live instance for `tag`, if one still exists.
pub(crate) fn lookup(tag: &str) -> Option<FederatedClient> {
    REGISTRY.with(|registry| {
        registry
            .borrow()
            .get(tag)
            .and_then(Weak::upgrade)
            .map(FederatedClient::from_inner)
    })
}

/// Register a freshly built instance under `tag`, purging dead entries
/// lazily while we're already holding the registry.
pub(crate) fn register(tag: String, inner: &Rc<RefCell<ClientInner>>) {
    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        registry.retain(|_, weak| weak.strong_count() > 0);
        debug!(tag, "registering federated client instance");
        registry.insert(tag, Rc::downgrade(inner));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientInner;

    #[test]
    fn register_then_lookup_returns_the_same_instance() {
        let inner = Rc::new(RefCell::new(ClientInner::test_instance()));
        register("tag-a".to_string(), &inner);
        assert!(lookup("tag-a").is_some());
        assert!(Rc::ptr_eq(&lookup("tag-a").unwrap().inner, &inner));
    }

    #[test]
    fn lookup_returns_none_once_every_strong_ref_is_dropped() {
        {
            let inner = Rc::new(RefCell::new(ClientInner::test_instance()));
            register("tag-b".to_string(), &inner);
            assert!(lookup("tag-b").is_some());
        }
        assert!(lookup("tag-b").is_none());
    }
}
