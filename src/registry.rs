//! Node Registry: resolves a logical node's currently selected
//! physical address and rotates among alternates on failure.

use std::collections::{HashMap, VecDeque};

use rand::seq::SliceRandom;

use crate::config::{NodeConfig, NodeName};

struct NodeEntry {
    /// Front is the currently selected address.
    addresses: VecDeque<String>,
}

/// Per-node address lists with rotation on failure.
#[derive(Default)]
pub struct NodeRegistry {
    nodes: HashMap<NodeName, NodeEntry>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node's descriptor. The alternates list is shuffled so
    /// independent processes don't all prefer the same alternate first.
    pub fn insert(&mut self, name: NodeName, config: &NodeConfig) {
        let mut addresses: VecDeque<String> = config.addresses().into();
        if addresses.len() > 1 {
            let mut shuffled: Vec<String> = addresses.into_iter().collect();
            shuffled.shuffle(&mut rand::thread_rng());
            addresses = shuffled.into();
        }
        self.nodes.insert(name, NodeEntry { addresses });
    }

    pub fn remove(&mut self, name: &NodeName) -> Option<Vec<String>> {
        self.nodes
            .remove(name)
            .map(|entry| entry.addresses.into_iter().collect())
    }

    /// The currently selected address for `name`.
    pub fn address_of(&self, name: &NodeName) -> Option<&str> {
        self.nodes
            .get(name)
            .and_then(|entry| entry.addresses.front())
            .map(String::as_str)
    }

    pub fn has_alternates(&self, name: &NodeName) -> bool {
        self.nodes
            .get(name)
            .is_some_and(|entry| entry.addresses.len() > 1)
    }

    /// Rotate to the next alternate, returning the newly selected address.
    /// A no-op (returns the single address unchanged) if there are no
    /// alternates.
    pub fn rotate(&mut self, name: &NodeName) -> Option<&str> {
        if let Some(entry) = self.nodes.get_mut(name) {
            if entry.addresses.len() > 1 {
                if let Some(front) = entry.addresses.pop_front() {
                    entry.addresses.push_back(front);
                }
            }
            entry.addresses.front().map(String::as_str)
        } else {
            None
        }
    }

    pub fn contains(&self, name: &NodeName) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &NodeName> {
        self.nodes.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_address_rotation_is_a_no_op() {
        let mut registry = NodeRegistry::new();
        let name = NodeName::from("foo");
        registry.insert(name.clone(), &NodeConfig::single("10.0.0.1:6379"));

        assert!(!registry.has_alternates(&name));
        assert_eq!(registry.address_of(&name), Some("10.0.0.1:6379"));
        registry.rotate(&name);
        assert_eq!(registry.address_of(&name), Some("10.0.0.1:6379"));
    }

    #[test]
    fn rotation_cycles_through_all_alternates() {
        let mut registry = NodeRegistry::new();
        let name = NodeName::from("foo");
        let addrs = ["a:1", "b:2", "c:3", "d:4"];
        registry.insert(name.clone(), &NodeConfig::alternates(addrs));
        assert!(registry.has_alternates(&name));

        let mut seen = std::collections::HashSet::new();
        for _ in 0..addrs.len() {
            seen.insert(registry.address_of(&name).unwrap().to_string());
            registry.rotate(&name);
        }
        assert_eq!(seen.len(), addrs.len());
        // after a full cycle we're back to whatever address started the loop
        assert!(seen.contains(registry.address_of(&name).unwrap()));
    }

    #[test]
    fn remove_evicts_the_node() {
        let mut registry = NodeRegistry::new();
        let name = NodeName::from("foo");
        registry.insert(name.clone(), &NodeConfig::single("a:1"));
        assert!(registry.contains(&name));
        registry.remove(&name);
        assert!(!registry.contains(&name));
        assert_eq!(registry.address_of(&name), None);
    }
}
