//! Per-route, per-status request counters served at `GET /stats`.

use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Route key -> status code -> count
pub type StatsSnapshot = BTreeMap<String, BTreeMap<u16, u64>>;

/// Request counters shared by every connection task.
///
/// All access goes through one lock; contention is low and each critical
/// section is a couple of map operations.
#[derive(Debug, Default)]
pub struct StatsLedger {
    counts: Mutex<StatsSnapshot>,
}

impl StatsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed zero counts for `statuses` the first time `route_key` is seen.
    pub fn ensure_route(&self, route_key: &str, statuses: impl IntoIterator<Item = u16>) {
        let mut counts = self.counts.lock();
        if !counts.contains_key(route_key) {
            let seeded = statuses.into_iter().map(|status| (status, 0)).collect();
            counts.insert(route_key.to_string(), seeded);
        }
    }

    /// Count one answered request
    pub fn increment(&self, route_key: &str, status: u16) {
        let mut counts = self.counts.lock();
        *counts
            .entry(route_key.to_string())
            .or_default()
            .entry(status)
            .or_insert(0) += 1;
    }

    /// Copy of the current counters
    pub fn snapshot(&self) -> StatsSnapshot {
        self.counts.lock().clone()
    }
}
