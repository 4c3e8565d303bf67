//! Constructor options: everything needed to build a
//! [`crate::FederatedClient`], deserializable so an embedding application can
//! load it from its own config file without the crate ever touching a
//! filesystem or environment variable itself.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A logical shard name: the consistent-hash target, never the address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeName(pub String);

impl NodeName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for NodeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One node's descriptor: a single address, or an ordered list of alternates
/// tried in order on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeConfig {
    Single { address: String },
    Alternates { addresses: Vec<String> },
}

impl NodeConfig {
    pub fn single(address: impl Into<String>) -> Self {
        Self::Single {
            address: address.into(),
        }
    }

    pub fn alternates(addresses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Alternates {
            addresses: addresses.into_iter().map(Into::into).collect(),
        }
    }

    /// The addresses in declared order (always at least one).
    pub fn addresses(&self) -> Vec<String> {
        match self {
            NodeConfig::Single { address } => vec![address.clone()],
            NodeConfig::Alternates { addresses } => addresses.clone(),
        }
    }
}

/// Health tracker tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub max_host_retries: u32,
    pub base_retry_interval: Duration,
    pub retry_interval_mult: f64,
    pub retry_slop_secs: u64,
    pub max_retry_interval: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            max_host_retries: 3,
            base_retry_interval: Duration::from_secs(10),
            retry_interval_mult: 2.0,
            retry_slop_secs: 5,
            max_retry_interval: Duration::from_secs(600),
        }
    }
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

const fn default_persistent() -> bool {
    true
}

/// Full set of constructor options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Required: the logical node set.
    pub nodes: BTreeMap<NodeName, NodeConfig>,

    /// Informational map `slave_addr -> master_addr`. Accepted, stored,
    /// never consulted by the core.
    #[serde(default)]
    pub master_of: BTreeMap<String, String>,

    /// Opaque tag enabling instance sharing via the object cache.
    #[serde(default)]
    pub tag: Option<String>,

    /// Per-batch command timeout. Zero disables it.
    #[serde(default = "default_command_timeout")]
    pub command_timeout: Duration,

    #[serde(default)]
    pub health: HealthConfig,

    /// Idle-connection expiry; zero disables it.
    #[serde(default)]
    pub idle_timeout: Duration,

    /// Reuse connections across calls. Default `true`.
    #[serde(default = "default_persistent")]
    pub persistent: bool,

    /// Emit extra `tracing::debug!` diagnostics.
    #[serde(default)]
    pub debug: bool,

    /// Bounds the connection-open suspension point.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(nodes: BTreeMap<NodeName, NodeConfig>) -> Self {
        Self {
            nodes,
            master_of: BTreeMap::new(),
            tag: None,
            command_timeout: default_command_timeout(),
            health: HealthConfig::default(),
            idle_timeout: Duration::ZERO,
            persistent: default_persistent(),
            debug: false,
            connect_timeout: default_connect_timeout(),
        }
    }

    /// Validate the fatal preconditions: at least one node, and every
    /// address parses as `host:port`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        for cfg in self.nodes.values() {
            for addr in cfg.addresses() {
                if addr.rsplit_once(':').is_none() {
                    return Err(ConfigError::InvalidAddress(addr));
                }
            }
        }
        Ok(())
    }
}
