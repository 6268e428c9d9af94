// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! The two-axis resource vector the arbitrator accounts in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_MEMORY, MIN_MILLI_CPU};

/// Comparison tolerance on the CPU axis, in milli-CPUs.
const EPSILON_MILLI_CPU: f64 = 0.01;

/// Comparison tolerance on the memory axis, in bytes.
const EPSILON_MEMORY: f64 = 1.0;

/// A CPU/memory resource vector.
///
/// `milli_cpu` is thousandths of a core; `memory` is bytes. Arithmetic is
/// plain f64 component arithmetic; `sub` may drive a component negative and
/// callers must not rely on saturation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "milliCPU")]
    pub milli_cpu: f64,
    pub memory: f64,
}

impl Resource {
    pub const fn new(milli_cpu: f64, memory: f64) -> Self {
        Self { milli_cpu, memory }
    }

    /// The zero vector.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when both axes are below the reclaim granularity
    /// (10 milli-CPU and 10 MiB). This is the threshold at which the
    /// reclaim loop stops pursuing further victims.
    pub fn is_empty(&self) -> bool {
        self.milli_cpu < MIN_MILLI_CPU && self.memory < MIN_MEMORY
    }

    /// Component-wise add, in place.
    pub fn add(&mut self, other: &Resource) -> &mut Self {
        self.milli_cpu += other.milli_cpu;
        self.memory += other.memory;
        self
    }

    /// Component-wise subtract, in place. May go negative.
    pub fn sub(&mut self, other: &Resource) -> &mut Self {
        self.milli_cpu -= other.milli_cpu;
        self.memory -= other.memory;
        self
    }

    /// Strictly less on both axes.
    pub fn less(&self, other: &Resource) -> bool {
        self.milli_cpu < other.milli_cpu && self.memory < other.memory
    }

    /// Less-or-within-tolerance on both axes (0.01 milli-CPU, 1 byte).
    pub fn less_equal(&self, other: &Resource) -> bool {
        (self.milli_cpu < other.milli_cpu
            || (self.milli_cpu - other.milli_cpu).abs() < EPSILON_MILLI_CPU)
            && (self.memory < other.memory || (self.memory - other.memory).abs() < EPSILON_MEMORY)
    }

    /// Equality within the comparison tolerances.
    pub fn approx_eq(&self, other: &Resource) -> bool {
        (self.milli_cpu - other.milli_cpu).abs() < EPSILON_MILLI_CPU
            && (self.memory - other.memory).abs() < EPSILON_MEMORY
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu {}, mem {}", self.milli_cpu, self.memory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sub() {
        let mut r = Resource::new(1000.0, 1024.0);
        r.add(&Resource::new(500.0, 512.0));
        assert_eq!(r, Resource::new(1500.0, 1536.0));

        r.sub(&Resource::new(2000.0, 0.0));
        assert_eq!(r.milli_cpu, -500.0);
        assert_eq!(r.memory, 1536.0);
    }

    #[test]
    fn test_is_empty_threshold() {
        assert!(Resource::empty().is_empty());
        assert!(Resource::new(9.9, 0.0).is_empty());
        assert!(Resource::new(0.0, 10.0 * 1024.0 * 1024.0 - 1.0).is_empty());

        // One axis at the threshold is enough to be non-empty.
        assert!(!Resource::new(10.0, 0.0).is_empty());
        assert!(!Resource::new(0.0, 10.0 * 1024.0 * 1024.0).is_empty());
    }

    #[test]
    fn test_less() {
        let small = Resource::new(100.0, 100.0);
        let big = Resource::new(200.0, 200.0);
        assert!(small.less(&big));
        assert!(!big.less(&small));
        // Strict on both axes.
        assert!(!Resource::new(100.0, 300.0).less(&big));
    }

    #[test]
    fn test_less_equal_tolerance() {
        let a = Resource::new(100.0, 100.0);
        assert!(a.less_equal(&Resource::new(100.0, 100.0)));
        assert!(a.less_equal(&Resource::new(100.005, 100.5)));
        assert!(!a.less_equal(&Resource::new(99.0, 100.0)));
        assert!(!a.less_equal(&Resource::new(100.0, 98.0)));
    }

    #[test]
    fn test_display() {
        let r = Resource::new(2000.0, 1024.0);
        assert_eq!(r.to_string(), "cpu 2000, mem 1024");
    }
}
