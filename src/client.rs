//! The federated client itself: owns every routing/health/connection
//! component and wires them together behind a single-execution-context
//! concurrency model.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{ClientConfig, NodeConfig, NodeName};
use crate::connection::ConnectionCache;
use crate::dispatcher;
use crate::health::HealthTracker;
use crate::key::{Arg, Key};
use crate::poller;
use crate::registry::NodeRegistry;
use crate::reply::Reply;
use crate::request_book::RequestBook;
use crate::ring::{HashRing, DEFAULT_WEIGHT};

/// Every piece of mutable state a `FederatedClient` owns. Lives behind
/// `Rc<RefCell<_>>`: confined to one `LocalSet`, never shared across
/// threads, so no internal locking is needed or used.
pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    pub(crate) ring: HashRing,
    pub(crate) registry: NodeRegistry,
    pub(crate) health: HealthTracker,
    pub(crate) connections: ConnectionCache,
    pub(crate) book: RequestBook,
}

impl ClientInner {
    fn new(config: ClientConfig) -> Self {
        let mut ring = HashRing::new();
        let mut registry = NodeRegistry::new();
        for (name, node_config) in &config.nodes {
            ring.add(name.clone(), DEFAULT_WEIGHT);
            registry.insert(name.clone(), node_config);
        }
        let health = HealthTracker::new(config.health.clone());
        let connections = ConnectionCache::new(config.idle_timeout, config.connect_timeout);
        Self {
            config,
            ring,
            registry,
            health,
            connections,
            book: RequestBook::new(),
        }
    }
}

/// A federated, asynchronous client fronting a pool of independent backend
/// instances behind one logical interface.
///
/// `FederatedClient` is deliberately `!Send`/`!Sync`: all of its state lives
/// behind a single-threaded `Rc<RefCell<_>>` rather than `Arc`/`Mutex`, so
/// every dispatch runs in one execution context with no internal locking.
/// Run it from inside a `tokio::task::LocalSet`:
///
/// ```rust,no_run
/// use federated_redis::{ClientConfig, NodeConfig, NodeName, FederatedClient};
///
/// # async fn run() -> anyhow::Result<()> {
/// let mut nodes = std::collections::BTreeMap::new();
/// nodes.insert(NodeName::new("redis_0"), NodeConfig::single("127.0.0.1:6379"));
/// let config = ClientConfig::new(nodes);
///
/// let local = tokio::task::LocalSet::new();
/// local.run_until(async move {
///     let client = FederatedClient::new(config)?;
///     client.set("hello", "world", |_| {});
///     client.poll().await;
///     Ok::<_, anyhow::Error>(())
/// }).await
/// # }
/// ```
#[derive(Clone)]
pub struct FederatedClient {
    pub(crate) inner: Rc<RefCell<ClientInner>>,
}

#[cfg(test)]
impl ClientInner {
    pub(crate) fn test_instance() -> Self {
        let mut nodes = std::collections::BTreeMap::new();
        nodes.insert(NodeName::new("redis_0"), NodeConfig::single("127.0.0.1:6379"));
        Self::new(ClientConfig::new(nodes))
    }
}

impl FederatedClient {
    pub fn new(config: ClientConfig) -> Result<Self, crate::error::ConfigError> {
        config.validate()?;
        info!(nodes = config.nodes.len(), "federated client constructed");
        Ok(Self {
            inner: Rc::new(RefCell::new(ClientInner::new(config))),
        })
    }

    pub(crate) fn from_inner(inner: Rc<RefCell<ClientInner>>) -> Self {
        Self { inner }
    }

    /// The single dynamic dispatch entry point: routes `key` to a node,
    /// rotates to an alternate address if the current one is down, and
    /// hands `verb`/arguments off to the backend, resolving `callback`
    /// with the reply.
    ///
    /// Key routing, alternate rotation, and the health gate run
    /// synchronously here so that, by the time `dispatch` returns, the
    /// request is already registered with the completion barrier: a
    /// concurrently issued `poll()` can never race ahead of a request that
    /// logically preceded it. Connection acquisition and the wire
    /// send/recv run in a spawned `tokio::task::spawn_local` future so many
    /// requests progress at once.
    ///
    /// The health gate runs before connection acquisition rather than
    /// after: acquiring a connection to an address already known to be
    /// down before refusing the request would defeat the point of having a
    /// gate at all. See DESIGN.md.
    pub fn dispatch(
        &self,
        verb: &str,
        key: impl Into<Key>,
        rest: Vec<Arg>,
        callback: impl FnOnce(Reply) + 'static,
    ) -> &Self {
        let key = key.into();
        let mut inner = self.inner.borrow_mut();

        let node = inner.ring.lookup(key.hash_bytes());
        let Some(mut addr) = inner.registry.address_of(&node).map(str::to_string) else {
            drop(inner);
            callback(Reply::Nil);
            return self;
        };

        if inner.health.is_down(&addr) && inner.registry.has_alternates(&node) {
            if let Some(next) = inner.registry.rotate(&node) {
                addr = next.to_string();
            }
        }

        if inner.health.is_down(&addr) && !inner.health.needs_retry(&addr) {
            debug!(address = %addr, verb, "refusing dispatch, backend still in backoff");
            drop(inner);
            callback(Reply::Nil);
            return self;
        }

        let verb = verb.to_string();
        let args = dispatcher::build_args(&verb, &key, rest);
        let id = inner.book.begin(addr.clone(), Box::new(callback));
        drop(inner);

        let inner_rc = Rc::clone(&self.inner);
        tokio::task::spawn_local(async move {
            dispatcher::run_request(inner_rc, id, node, addr, verb, args).await;
        });

        self
    }

    /// Wait for every request dispatched so far to settle, or for
    /// `command_timeout` to elapse.
    pub async fn poll(&self) {
        let timeout = self.inner.borrow().config.command_timeout;
        poller::poll(Rc::clone(&self.inner), timeout).await;
    }

    pub fn get(&self, key: impl Into<Key>, callback: impl FnOnce(Reply) + 'static) -> &Self {
        self.dispatch("GET", key, Vec::new(), callback)
    }

    pub fn set(
        &self,
        key: impl Into<Key>,
        value: impl Into<Arg>,
        callback: impl FnOnce(Reply) + 'static,
    ) -> &Self {
        self.dispatch("SET", key, vec![value.into()], callback)
    }

    pub fn del(&self, key: impl Into<Key>, callback: impl FnOnce(Reply) + 'static) -> &Self {
        self.dispatch("DEL", key, Vec::new(), callback)
    }

    pub fn expire(
        &self,
        key: impl Into<Key>,
        seconds: u64,
        callback: impl FnOnce(Reply) + 'static,
    ) -> &Self {
        self.dispatch("EXPIRE", key, vec![seconds.to_string().into_bytes().into()], callback)
    }

    /// `MULTI`/`EXEC` take no forwarded key argument; `key` only selects
    /// which shard's connection the transaction runs on.
    pub fn multi(&self, key: impl Into<Key>, callback: impl FnOnce(Reply) + 'static) -> &Self {
        self.dispatch("MULTI", key, Vec::new(), callback)
    }

    pub fn exec(&self, key: impl Into<Key>, callback: impl FnOnce(Reply) + 'static) -> &Self {
        self.dispatch("EXEC", key, Vec::new(), callback)
    }

    /// The node currently owning `key`.
    pub fn key_to_node(&self, key: impl Into<Key>) -> NodeName {
        let key = key.into();
        self.inner.borrow().ring.lookup(key.hash_bytes())
    }

    /// The currently selected physical address for `node`.
    pub fn node_to_host(&self, node: &NodeName) -> Option<String> {
        self.inner.borrow().registry.address_of(node).map(str::to_string)
    }

    pub fn is_server_down(&self, addr: &str) -> bool {
        self.inner.borrow().health.is_down(addr)
    }

    pub fn is_server_up(&self, addr: &str) -> bool {
        !self.is_server_down(addr)
    }

    pub fn mark_server_down(&self, addr: &str) {
        self.inner.borrow_mut().health.mark_down(addr);
    }

    pub fn mark_server_up(&self, addr: &str) {
        self.inner.borrow_mut().health.mark_up(addr);
    }

    /// Get, and optionally set, the per-batch command timeout on a live
    /// instance. Passing `Some(timeout)` updates `command_timeout` before
    /// returning the value now in effect; a later `poll()` call picks up the
    /// new value, since `poll()` reads it fresh each time it's called.
    pub fn command_timeout(&self, new_value: Option<Duration>) -> Duration {
        let mut inner = self.inner.borrow_mut();
        if let Some(timeout) = new_value {
            inner.config.command_timeout = timeout;
        }
        inner.config.command_timeout
    }

    /// Add (or re-weight) a node at runtime.
    pub fn add_node(&self, name: NodeName, config: NodeConfig, weight: u32) {
        let mut inner = self.inner.borrow_mut();
        inner.ring.add(name.clone(), weight);
        inner.registry.insert(name.clone(), &config);
        inner.config.nodes.insert(name, config);
    }

    /// Remove a node, evicting its addresses from the Connection Cache too
    /// so nothing can hand out a stale connection to a shard that's gone.
    pub fn remove_node(&self, name: &NodeName) {
        let mut inner = self.inner.borrow_mut();
        inner.ring.remove(name);
        if let Some(addrs) = inner.registry.remove(name) {
            for addr in addrs {
                inner.connections.evict(&addr);
            }
        }
        inner.config.nodes.remove(name);
    }
}
