// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Metrics collection for fairshare.
//!
//! Tagged counters and gauges held in process memory; export to a sink is
//! the embedding process's concern.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

/// A tagged metric.
pub trait Metric: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
}

/// A monotonically increasing counter.
#[derive(Clone)]
pub struct Counter {
    name: String,
    description: String,
    values: Arc<Mutex<HashMap<Vec<(String, String)>, u64>>>,
}

impl Counter {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            values: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn increment(&self, tags: &[(String, String)], delta: u64) {
        let mut values = self.values.lock();
        *values.entry(tags.to_vec()).or_insert(0) += delta;
    }

    pub fn get(&self, tags: &[(String, String)]) -> u64 {
        self.values.lock().get(tags).copied().unwrap_or(0)
    }
}

impl Metric for Counter {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
}

/// A gauge that can go up or down.
#[derive(Clone)]
pub struct Gauge {
    name: String,
    description: String,
    values: Arc<Mutex<HashMap<Vec<(String, String)>, f64>>>,
}

impl Gauge {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            values: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn set(&self, tags: &[(String, String)], value: f64) {
        self.values.lock().insert(tags.to_vec(), value);
    }

    pub fn get(&self, tags: &[(String, String)]) -> f64 {
        self.values.lock().get(tags).copied().unwrap_or(0.0)
    }
}

impl Metric for Gauge {
    fn name(&self) -> &str {
        &self.name
    }
    fn description(&self) -> &str {
        &self.description
    }
}

/// Tag key for the fault zone of an eviction.
pub const TAG_ZONE: &str = "zone";

/// Reclaim attempts, tagged by fault zone. Incremented once per unbind
/// attempt whether or not it succeeds.
pub fn evictions_total() -> Counter {
    Counter::new("evictions_total", "Number of pod eviction attempts")
}

/// Convenience for a single-zone tag set.
pub fn zone_tags(zone: &str) -> Vec<(String, String)> {
    vec![(TAG_ZONE.to_string(), zone.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_accumulates_per_tag_set() {
        let evictions = evictions_total();
        let east = zone_tags("east");
        let west = zone_tags("west");

        evictions.increment(&east, 1);
        evictions.increment(&east, 2);
        evictions.increment(&west, 1);

        assert_eq!(evictions.get(&east), 3);
        assert_eq!(evictions.get(&west), 1);
        assert_eq!(evictions.get(&zone_tags("north")), 0);
    }

    #[test]
    fn test_gauge_overwrites() {
        let gauge = Gauge::new("pending_reclaims", "Reclaim requests in queue");
        let tags = zone_tags("");
        gauge.set(&tags, 2.0);
        gauge.set(&tags, 5.0);
        assert_eq!(gauge.get(&tags), 5.0);
    }

    #[test]
    fn test_metric_metadata() {
        let counter = evictions_total();
        assert_eq!(counter.name(), "evictions_total");
        assert!(!counter.description().is_empty());
    }
}
