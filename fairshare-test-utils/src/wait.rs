// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Async-aware wait utilities for tests.

use std::future::Future;
use std::time::Duration;

/// Poll a synchronous condition every 10ms until it returns true or the
/// timeout elapses. Returns whether the condition was met.
pub async fn wait_for_condition<F>(condition: F, timeout_ms: u64) -> bool
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait for a future to produce `true` within the given timeout.
pub async fn wait_ready<F>(future: F, timeout: Duration) -> bool
where
    F: Future<Output = bool>,
{
    tokio::time::timeout(timeout, future)
        .await
        .unwrap_or_default()
}
