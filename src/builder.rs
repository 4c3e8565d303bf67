//! `ClientBuilder`: construction-time validation plus the tag-keyed instance
//! cache.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::client::FederatedClient;
use crate::config::{ClientConfig, HealthConfig, NodeConfig, NodeName};
use crate::error::ConfigError;
use crate::instance_cache;

/// Builds a [`FederatedClient`], validating the fatal preconditions before
/// ever touching the network.
#[derive(Debug, Default)]
pub struct ClientBuilder {
    nodes: BTreeMap<NodeName, NodeConfig>,
    master_of: BTreeMap<String, String>,
    tag: Option<String>,
    command_timeout: Option<Duration>,
    health: Option<HealthConfig>,
    idle_timeout: Option<Duration>,
    persistent: Option<bool>,
    debug: Option<bool>,
    connect_timeout: Option<Duration>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, name: NodeName, config: NodeConfig) -> Self {
        self.nodes.insert(name, config);
        self
    }

    pub fn master_of(mut self, slave: impl Into<String>, master: impl Into<String>) -> Self {
        self.master_of.insert(slave.into(), master.into());
        self
    }

    /// Tag this client for instance sharing: building with the same `tag`
    /// again, while a previous instance is still alive, returns that
    /// instance instead of constructing a new one.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = Some(timeout);
        self
    }

    pub fn health(mut self, health: HealthConfig) -> Self {
        self.health = Some(health);
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = Some(persistent);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<FederatedClient, ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }

        if let Some(tag) = self.tag.as_deref() {
            if let Some(existing) = instance_cache::lookup(tag) {
                return Ok(existing);
            }
        }

        let mut config = ClientConfig::new(self.nodes);
        config.master_of = self.master_of;
        config.tag = self.tag.clone();
        if let Some(v) = self.command_timeout {
            config.command_timeout = v;
        }
        if let Some(v) = self.health {
            config.health = v;
        }
        if let Some(v) = self.idle_timeout {
            config.idle_timeout = v;
        }
        if let Some(v) = self.persistent {
            config.persistent = v;
        }
        if let Some(v) = self.debug {
            config.debug = v;
        }
        if let Some(v) = self.connect_timeout {
            config.connect_timeout = v;
        }

        let client = FederatedClient::new(config)?;
        if let Some(tag) = self.tag {
            instance_cache::register(tag, &client.inner);
        }
        Ok(client)
    }
}
