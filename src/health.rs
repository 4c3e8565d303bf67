//! Health Tracker: per-physical-address failure bookkeeping driving the
//! fast-retry / exponential-backoff state machine.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::warn;

use crate::config::HealthConfig;

#[derive(Debug, Clone)]
struct HealthRecord {
    consecutive_failures: u32,
    last_attempt: Instant,
    down_since: Instant,
    current_retry_interval: Duration,
}

/// Tracks up/down state per physical address. Addresses with no record are
/// implicitly up; the absence of a record is itself the "up" state, rather
/// than an explicit flag with unused fields.
pub struct HealthTracker {
    config: HealthConfig,
    records: HashMap<String, HealthRecord>,
}

impl HealthTracker {
    pub fn new(config: HealthConfig) -> Self {
        Self {
            config,
            records: HashMap::new(),
        }
    }

    pub fn is_down(&self, addr: &str) -> bool {
        self.records.contains_key(addr)
    }

    /// Record a failed attempt against `addr`, applying the fast-retry /
    /// backoff state machine transitions.
    pub fn mark_down(&mut self, addr: &str) {
        let now = Instant::now();
        let cfg = &self.config;
        let first_time = !self.records.contains_key(addr);
        let record = self.records.entry(addr.to_string()).or_insert_with(|| HealthRecord {
            consecutive_failures: 0,
            last_attempt: now,
            down_since: now,
            current_retry_interval: cfg.base_retry_interval,
        });

        if first_time {
            warn!(address = %addr, "backend marked down");
        }

        record.consecutive_failures += 1;
        record.last_attempt = now;

        if record.consecutive_failures == cfg.max_host_retries {
            warn!(
                address = %addr,
                failures = record.consecutive_failures,
                "backend crossed max_host_retries, entering exponential backoff"
            );
        }

        // Bump the interval only once we're already in backoff (failures
        // strictly beyond max_host_retries): the failure that first
        // crosses the threshold still retries at the base interval.
        if record.consecutive_failures > cfg.max_host_retries
            && record.current_retry_interval < cfg.max_retry_interval
        {
            let slop = cfg.retry_slop_secs.max(1);
            let jitter = Duration::from_secs(rand::thread_rng().gen_range(0..slop));
            let bumped = record
                .current_retry_interval
                .mul_f64(cfg.retry_interval_mult)
                + jitter;
            let capped = bumped.min(cfg.max_retry_interval);
            if capped > record.current_retry_interval {
                warn!(address = %addr, retry_interval = ?capped, "backend retry interval increased");
            }
            record.current_retry_interval = capped;
        }
    }

    /// Clear the record on a successful reply.
    pub fn mark_up(&mut self, addr: &str) {
        if let Some(record) = self.records.remove(addr) {
            warn!(
                address = %addr,
                down_since = ?record.down_since,
                "backend recovered"
            );
        }
    }

    /// Whether a currently-down address may be retried right now.
    ///
    /// Addresses within `max_host_retries` failures retry unconditionally
    /// ("fast" phase); beyond that they retry only once the backoff
    /// interval has elapsed since the last attempt.
    pub fn needs_retry(&self, addr: &str) -> bool {
        match self.records.get(addr) {
            None => true,
            Some(record) => {
                if record.consecutive_failures < self.config.max_host_retries {
                    true
                } else {
                    record.last_attempt.elapsed() >= record.current_retry_interval
                }
            }
        }
    }

    /// Current retry interval for a down address, for testing/diagnostics.
    #[cfg(test)]
    fn current_retry_interval(&self, addr: &str) -> Option<Duration> {
        self.records.get(addr).map(|r| r.current_retry_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> HealthConfig {
        HealthConfig {
            max_host_retries: 3,
            base_retry_interval: Duration::from_millis(10),
            retry_interval_mult: 2.0,
            retry_slop_secs: 1,
            max_retry_interval: Duration::from_millis(100),
        }
    }

    #[test]
    fn up_by_default() {
        let tracker = HealthTracker::new(fast_config());
        assert!(!tracker.is_down("a:1"));
        assert!(tracker.needs_retry("a:1"));
    }

    #[test]
    fn fast_phase_always_allows_retry() {
        let mut tracker = HealthTracker::new(fast_config());
        tracker.mark_down("a:1");
        assert!(tracker.is_down("a:1"));
        assert!(tracker.needs_retry("a:1"));
        tracker.mark_down("a:1");
        assert!(tracker.needs_retry("a:1"));
    }

    #[test]
    fn backoff_monotonicity_and_cap() {
        let mut tracker = HealthTracker::new(fast_config());
        let mut last = Duration::ZERO;
        for _ in 0..10 {
            tracker.mark_down("a:1");
            let current = tracker.current_retry_interval("a:1").unwrap();
            assert!(current >= last, "retry interval must never decrease");
            assert!(current <= Duration::from_millis(100), "must respect the cap");
            last = current;
        }
    }

    #[test]
    fn recovery_clears_the_record() {
        let mut tracker = HealthTracker::new(fast_config());
        tracker.mark_down("a:1");
        tracker.mark_down("a:1");
        tracker.mark_down("a:1");
        tracker.mark_down("a:1");
        assert!(tracker.is_down("a:1"));

        tracker.mark_up("a:1");
        assert!(!tracker.is_down("a:1"));
        assert!(tracker.current_retry_interval("a:1").is_none());
        assert!(tracker.needs_retry("a:1"));
    }

    #[test]
    fn backoff_gates_retry_until_interval_elapses() {
        let mut tracker = HealthTracker::new(fast_config());
        for _ in 0..4 {
            tracker.mark_down("a:1");
        }
        // Immediately after a failed attempt in backoff, retry should be refused.
        assert!(!tracker.needs_retry("a:1"));
        std::thread::sleep(Duration::from_millis(150));
        assert!(tracker.needs_retry("a:1"));
    }
}
