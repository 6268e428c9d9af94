// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Exponential backoff for transient-failure retry loops.

use std::time::Duration;

/// Exponential backoff calculator with optional jitter.
pub struct ExponentialBackoff {
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Duration,
    current_delay: Duration,
}

impl ExponentialBackoff {
    pub fn new(initial_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            multiplier,
            max_delay,
            current_delay: initial_delay,
        }
    }

    /// The next delay; advances the internal state.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay;
        let grown = Duration::from_secs_f64(self.current_delay.as_secs_f64() * self.multiplier);
        self.current_delay = grown.min(self.max_delay);
        delay
    }

    /// The next delay with up to +50% random jitter, capped at the maximum.
    pub fn next_delay_with_jitter(&mut self) -> Duration {
        let delay = self.next_delay();
        let jitter = 1.0 + rand::random::<f64>() * 0.5;
        Duration::from_secs_f64(delay.as_secs_f64() * jitter).min(self.max_delay)
    }

    /// Return to the initial delay (after a success).
    pub fn reset(&mut self) {
        self.current_delay = self.initial_delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doubles_until_cap() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(250), 2.0, Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_millis(250));
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_reset_restores_initial() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), 3.0, Duration::from_secs(10));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_jitter_stays_capped() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(8), 2.0, Duration::from_secs(10));
        for _ in 0..16 {
            assert!(backoff.next_delay_with_jitter() <= Duration::from_secs(10));
        }
    }
}
