//! Federated Redis Client
//!
//! A federated, asynchronous client that shards a pool of independent Redis
//! (or Redis-compatible) instances behind one logical interface:
//! - **Consistent-hash routing**: a fixed 1024-bucket ring maps every key to
//!   one logical node, moving only the necessary buckets when nodes join or
//!   leave.
//! - **Per-address failure detection**: fast retries followed by capped
//!   exponential backoff with jitter, plus rotation among alternate
//!   addresses for a node.
//! - **Connection reuse**: one live connection per address, with optional
//!   idle expiry.
//! - **Batched dispatch**: many requests in flight at once inside a single
//!   execution context, settled by one completion barrier with a per-batch
//!   command timeout.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use federated_redis::{ClientConfig, NodeConfig, NodeName, FederatedClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let local = tokio::task::LocalSet::new();
//!     local.run_until(async {
//!         let mut nodes = std::collections::BTreeMap::new();
//!         nodes.insert(NodeName::new("redis_0"), NodeConfig::single("127.0.0.1:6379"));
//!         nodes.insert(NodeName::new("redis_1"), NodeConfig::single("127.0.0.1:6380"));
//!         let client = FederatedClient::new(ClientConfig::new(nodes))?;
//!
//!         client.set("user:1", "alice", |_| {});
//!         client.get("user:1", |reply| {
//!             println!("got back: {:?}", reply.as_str());
//!         });
//!         client.poll().await;
//!
//!         Ok::<_, anyhow::Error>(())
//!     }).await
//! }
//! ```
//!
//! # Concurrency model
//!
//! [`FederatedClient`] is `!Send`/`!Sync` by design: its state lives behind
//! a single-threaded `Rc<RefCell<_>>` rather than `Arc`/`Mutex`. It must run
//! inside a `tokio::task::LocalSet` (see above); user callbacks are plain
//! `FnOnce(Reply)` closures, not required to be `Send`.
//!
//! # Error handling
//!
//! Only construction-time misconfiguration ([`ConfigError`]) is ever
//! returned as a `Result`. Every runtime failure (a dropped connection, an
//! address still in backoff, a command that didn't finish before
//! `command_timeout`) resolves the caller's callback with [`Reply::Nil`]
//! instead. A `-ERR ...` reply from the backend is not a failure in this
//! sense; it arrives as [`Reply::Error`].

pub mod builder;
pub mod client;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod health;
mod instance_cache;
pub mod key;
pub mod poller;
pub mod registry;
pub mod reply;
pub mod request_book;
pub mod ring;

pub use builder::ClientBuilder;
pub use client::FederatedClient;
pub use config::{ClientConfig, HealthConfig, NodeConfig, NodeName};
pub use error::ConfigError;
pub use key::{Arg, Key};
pub use reply::Reply;
