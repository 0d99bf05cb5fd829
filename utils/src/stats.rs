//! Statistics collection and reporting utilities.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe counter collection for indexer statistics.
pub struct StatsCounter {
    counters: HashMap<&'static str, AtomicU64>,
}

impl StatsCounter {
    pub fn new(names: &[&'static str]) -> Self {
        let mut counters = HashMap::new();
        for &name in names {
            counters.insert(name, AtomicU64::new(0));
        }
        Self { counters }
    }

    pub fn increment(&self, name: &str) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn add(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
        }
    }

    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> HashMap<&'static str, u64> {
        self.counters
            .iter()
            .map(|(&k, v)| (k, v.load(Ordering::Relaxed)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_and_get() {
        let stats = StatsCounter::new(&["added", "executed"]);
        stats.increment("added");
        stats.increment("added");
        stats.add("executed", 5);
        assert_eq!(stats.get("added"), 2);
        assert_eq!(stats.get("executed"), 5);
    }

    #[test]
    fn unknown_counter_is_zero_and_ignored() {
        let stats = StatsCounter::new(&["added"]);
        stats.increment("nope");
        assert_eq!(stats.get("nope"), 0);
    }

    #[test]
    fn snapshot_contains_all() {
        let stats = StatsCounter::new(&["a", "b"]);
        stats.increment("a");
        let snap = stats.snapshot();
        assert_eq!(snap["a"], 1);
        assert_eq!(snap["b"], 0);
    }
}
