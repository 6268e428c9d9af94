// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Timing helpers.

use std::time::{Duration, Instant};

/// A monotonic stopwatch for measuring elapsed time.
pub struct Stopwatch {
    start: Instant,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed().as_millis() as u64
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwatch_advances() {
        let sw = Stopwatch::new();
        std::thread::sleep(Duration::from_millis(10));
        assert!(sw.elapsed_ms() >= 10);
    }

    #[test]
    fn test_reset() {
        let mut sw = Stopwatch::new();
        std::thread::sleep(Duration::from_millis(10));
        sw.reset();
        assert!(sw.elapsed() < Duration::from_millis(10));
    }
}
