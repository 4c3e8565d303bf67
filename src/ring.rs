//! Hash Ring: maps an opaque byte string to one of the configured node
//! names via a fixed-size bucket array over a consistent-hash construction.

use std::collections::BTreeMap;

use crate::config::NodeName;

/// Number of fixed buckets in the ring.
pub const BUCKET_COUNT: usize = 1024;

/// Nominal weight for a node with no explicit override.
pub const DEFAULT_WEIGHT: u32 = 10;

/// `hash(bytes) -> u32`: the first 4 bytes (big-endian) of the MD5 digest.
/// This value is protocol-visible: every client must compute it the same
/// way, or keys land on different shards in different processes.
pub fn hash_key(bytes: &[u8]) -> u32 {
    let digest = md5::compute(bytes);
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Consistent-hash ring over logical node names.
///
/// Internally this is a classic "virtual node" (ketama-style) ring: each
/// node contributes `weight` virtual points into a sorted ring, and each of
/// the [`BUCKET_COUNT`] fixed buckets is assigned to the node owning the
/// first virtual point at or after the bucket's own hash. Adding or
/// removing a node only touches the virtual points for that node, so only
/// the buckets that must move, do.
#[derive(Debug, Default, Clone)]
pub struct HashRing {
    weights: BTreeMap<NodeName, u32>,
    points: BTreeMap<u32, NodeName>,
    buckets: Vec<NodeName>,
}

impl HashRing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the node name currently owning `key_bytes`.
    ///
    /// # Panics
    ///
    /// Panics if the ring has no nodes; callers must configure at least one
    /// node before dispatching, which `ClientConfig::validate` enforces.
    pub fn lookup(&self, key_bytes: &[u8]) -> NodeName {
        assert!(!self.buckets.is_empty(), "hash ring has no nodes");
        let bucket = (hash_key(key_bytes) as usize) % BUCKET_COUNT;
        self.buckets[bucket].clone()
    }

    /// Add (or re-weight) a node and rebuild affected buckets.
    pub fn add(&mut self, name: NodeName, weight: u32) {
        self.remove_points(&name);
        if weight > 0 {
            self.weights.insert(name.clone(), weight);
            for i in 0..weight {
                let label = format!("{name}-{i}");
                self.points.insert(hash_key(label.as_bytes()), name.clone());
            }
        } else {
            self.weights.remove(&name);
        }
        self.rebuild();
    }

    /// Remove a node entirely (equivalent to `modify_targets(name -> 0)`).
    pub fn remove(&mut self, name: &NodeName) {
        self.weights.remove(name);
        self.remove_points(name);
        self.rebuild();
    }

    fn remove_points(&mut self, name: &NodeName) {
        self.points.retain(|_, owner| owner != name);
    }

    fn rebuild(&mut self) {
        if self.points.is_empty() {
            self.buckets.clear();
            return;
        }
        let mut buckets = Vec::with_capacity(BUCKET_COUNT);
        for bucket in 0..BUCKET_COUNT {
            let target = hash_key(&(bucket as u32).to_be_bytes());
            let owner = self
                .points
                .range(target..)
                .next()
                .or_else(|| self.points.iter().next())
                .map(|(_, name)| name.clone())
                .expect("points is non-empty");
            buckets.push(owner);
        }
        self.buckets = buckets;
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeName> {
        self.weights.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(names: &[&str]) -> HashRing {
        let mut ring = HashRing::new();
        for name in names {
            ring.add(NodeName::from(*name), DEFAULT_WEIGHT);
        }
        ring
    }

    #[test]
    fn lookup_is_deterministic_and_matches_the_hash_formula() {
        let ring = ring_of(&["redis_0", "redis_1", "redis_2"]);
        for key in ["ducati", "foo1", "user:42", ""] {
            let expected_bucket = (hash_key(key.as_bytes()) as usize) % BUCKET_COUNT;
            let first = ring.lookup(key.as_bytes());
            let second = ring.lookup(key.as_bytes());
            assert_eq!(first, second);
            assert_eq!(ring.buckets[expected_bucket], first);
        }
    }

    #[test]
    fn every_bucket_maps_to_a_configured_node() {
        let ring = ring_of(&["a", "b", "c", "d"]);
        let names: std::collections::HashSet<_> = ring.nodes().cloned().collect();
        for owner in &ring.buckets {
            assert!(names.contains(owner));
        }
    }

    #[test]
    fn key_group_equivalence() {
        let ring = ring_of(&["redis_0", "redis_1", "redis_2", "redis_3"]);
        let group = b"user:42";
        let node_for_group = ring.lookup(group);
        // Two different keys sharing the same explicit hash input must land
        // on the same node. The ring only ever sees the hash key, never the
        // forwarded key, so this holds trivially, but we assert the
        // hash-key contract here rather than in the dispatcher.
        assert_eq!(ring.lookup(group), node_for_group);
    }

    #[test]
    fn add_then_remove_is_idempotent_for_other_nodes() {
        let mut ring = ring_of(&["a", "b", "c"]);
        let before = ring.buckets.clone();

        ring.add(NodeName::from("d"), DEFAULT_WEIGHT);
        ring.remove(&NodeName::from("d"));

        assert_eq!(ring.buckets, before);
    }

    #[test]
    fn adding_a_node_only_moves_some_buckets() {
        let mut ring = ring_of(&["a", "b", "c"]);
        let before = ring.buckets.clone();

        ring.add(NodeName::from("d"), DEFAULT_WEIGHT);

        let moved = before
            .iter()
            .zip(ring.buckets.iter())
            .filter(|(b, a)| b != a)
            .count();
        assert!(moved > 0, "adding a node should move at least one bucket");
        assert!(
            moved < BUCKET_COUNT,
            "adding a node should not move every bucket"
        );
    }
}
