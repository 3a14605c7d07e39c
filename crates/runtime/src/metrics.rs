use std::collections::BTreeMap;

/// Deterministic counters for the interactive session.
///
/// Sorted maps keep snapshots stable for logs and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Metrics {
    counters: BTreeMap<&'static str, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn inc(&mut self, name: &'static str) {
        self.inc_by(name, 1);
    }

    pub fn inc_by(&mut self, name: &'static str, by: u64) {
        *self.counters.entry(name).or_insert(0) += by;
    }

    /// Sorted `(name, value)` pairs of every counter.
    pub fn counters(&self) -> Vec<(&'static str, u64)> {
        self.counters.iter().map(|(k, v)| (*k, *v)).collect()
    }
}
