//! Request Book & Barrier: request-id bookkeeping and the single
//! completion barrier a `poll()` call waits on.

use std::collections::HashMap;
use std::rc::Rc;

use tokio::sync::Notify;

use crate::reply::Reply;

/// Process-wide-within-this-client monotonic request id.
pub type RequestId = u64;

/// Bookkeeping for one in-flight request. Presence in the book's map *is*
/// the "open" state; removal destroys the record. Collapsing `{open,
/// cancelled}` into "present vs absent" means a late reply and the
/// Poller's timeout cancellation can never both decrement the barrier for
/// the same request (see DESIGN.md for the reasoning).
pub struct RequestRecord {
    pub address: String,
    pub callback: Box<dyn FnOnce(Reply)>,
}

/// Tracks open requests and signals the barrier when none remain.
pub struct RequestBook {
    next_id: RequestId,
    open: HashMap<RequestId, RequestRecord>,
    notify: Rc<Notify>,
}

impl Default for RequestBook {
    fn default() -> Self {
        Self {
            next_id: 0,
            open: HashMap::new(),
            notify: Rc::new(Notify::new()),
        }
    }
}

impl RequestBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a new id and register it as open.
    pub fn begin(&mut self, address: String, callback: Box<dyn FnOnce(Reply)>) -> RequestId {
        let id = self.next_id;
        self.next_id += 1;
        self.open.insert(id, RequestRecord { address, callback });
        id
    }

    /// Remove and return the record for `id`, if it is still open. Signals
    /// the barrier if this was the last open request.
    pub fn take(&mut self, id: RequestId) -> Option<RequestRecord> {
        let record = self.open.remove(&id);
        if record.is_some() && self.open.is_empty() {
            self.notify.notify_waiters();
        }
        record
    }

    pub fn is_open(&self, id: RequestId) -> bool {
        self.open.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.open.len()
    }

    /// Drain every open request (the Poller's timeout path).
    pub fn drain_all(&mut self) -> Vec<(RequestId, RequestRecord)> {
        let drained: Vec<_> = self.open.drain().collect();
        if !drained.is_empty() {
            self.notify.notify_waiters();
        }
        drained
    }

    /// Handle to the underlying barrier primitive, for the Poller.
    pub fn barrier(&self) -> Rc<Notify> {
        self.notify.clone()
    }
}
