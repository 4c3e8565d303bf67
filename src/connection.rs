//! Connection Cache: at most one live backend connection per physical
//! address, with an optional idle-expiry policy.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use redis::aio::ConnectionManager;
use tokio::time::Instant;
use tracing::debug;

struct CachedConnection {
    conn: ConnectionManager,
    last_used: Instant,
}

/// Caches one [`ConnectionManager`] per address. `ConnectionManager` is
/// cheap to clone (it shares the underlying connection and reconnects on
/// its own after a drop), so `try_get_fresh` hands out clones while the
/// cache keeps the canonical entry.
pub struct ConnectionCache {
    idle_timeout: Duration,
    connect_timeout: Duration,
    connections: HashMap<String, CachedConnection>,
}

impl ConnectionCache {
    pub fn new(idle_timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            idle_timeout,
            connect_timeout,
            connections: HashMap::new(),
        }
    }

    /// Non-blocking cache lookup, honoring idle expiry. Does not open a new
    /// connection on a miss: callers must `await`
    /// [`ConnectionCache::open`] and then [`ConnectionCache::insert`]
    /// without holding any borrow across that `await` (see
    /// `dispatcher::run_request`).
    pub fn try_get_fresh(&mut self, addr: &str) -> Option<ConnectionManager> {
        if !self.idle_timeout.is_zero() {
            if let Some(cached) = self.connections.get(addr) {
                if cached.last_used.elapsed() >= self.idle_timeout {
                    debug!(address = %addr, "idle connection expired, reconnecting");
                    self.connections.remove(addr);
                }
            }
        }
        self.connections.get(addr).map(|cached| cached.conn.clone())
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Open a brand-new connection. A free-standing async step so it never
    /// holds a `RefCell` borrow of the owning client across its `.await`.
    pub async fn open(addr: &str, connect_timeout: Duration) -> anyhow::Result<ConnectionManager> {
        debug!(address = %addr, "opening backend connection");
        let client = redis::Client::open(format!("redis://{addr}"))
            .with_context(|| format!("invalid backend address `{addr}`"))?;
        let conn = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .with_context(|| format!("connecting to `{addr}` timed out"))?
            .with_context(|| format!("failed to connect to `{addr}`"))?;
        Ok(conn)
    }

    pub fn insert(&mut self, addr: String, conn: ConnectionManager) {
        self.connections.insert(
            addr,
            CachedConnection {
                conn,
                last_used: Instant::now(),
            },
        );
    }

    /// Refresh the last-used timestamp after a successful reply.
    pub fn touch(&mut self, addr: &str) {
        if let Some(cached) = self.connections.get_mut(addr) {
            cached.last_used = Instant::now();
        }
    }

    /// Drop the cached connection for `addr`: called when a node's address
    /// is removed, and on connection error.
    pub fn evict(&mut self, addr: &str) {
        self.connections.remove(addr);
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
