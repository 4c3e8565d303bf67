//! Shared test infrastructure for integration tests.
//!
//! Most scenarios here need one or more live Redis instances, reachable via
//! `REDIS_URL`/`REDIS_URL_2`/`REDIS_URL_3` (falling back to local defaults so
//! a single `redis-server` on the default port is enough to exercise S1/S2).

use std::collections::BTreeMap;

use federated_redis::{ClientConfig, FederatedClient, NodeConfig, NodeName};

pub fn redis_url(n: u8) -> String {
    let var = if n <= 1 {
        "REDIS_URL".to_string()
    } else {
        format!("REDIS_URL_{n}")
    };
    let default_port = 6379 + u16::from(n.saturating_sub(1));
    std::env::var(var).unwrap_or_else(|_| format!("127.0.0.1:{default_port}"))
}

/// A unique key per test run, so concurrent test binaries never collide.
pub fn test_key(name: &str) -> String {
    format!("federated_redis_test:{name}:{}", rand::random::<u32>())
}

/// A single-node client pointed at `REDIS_URL` (S1, S4 against a dead node).
pub fn single_node_config() -> ClientConfig {
    let mut nodes = BTreeMap::new();
    nodes.insert(NodeName::new("redis_0"), NodeConfig::single(redis_url(1)));
    ClientConfig::new(nodes)
}

/// A two-node client across `REDIS_URL`/`REDIS_URL_2` (S2, chained dispatch
/// landing on distinct shards).
pub fn two_node_config() -> ClientConfig {
    let mut nodes = BTreeMap::new();
    nodes.insert(NodeName::new("redis_0"), NodeConfig::single(redis_url(1)));
    nodes.insert(NodeName::new("redis_1"), NodeConfig::single(redis_url(2)));
    ClientConfig::new(nodes)
}

/// A node with a primary address nothing listens on, and a working
/// alternate (S5, multi-address failover).
pub fn failover_config() -> ClientConfig {
    let mut nodes = BTreeMap::new();
    nodes.insert(
        NodeName::new("redis_0"),
        NodeConfig::alternates(["198.51.100.1:6379", &redis_url(1)]),
    );
    ClientConfig::new(nodes)
}

pub fn build_client(config: ClientConfig) -> FederatedClient {
    FederatedClient::new(config).expect("valid test configuration")
}
