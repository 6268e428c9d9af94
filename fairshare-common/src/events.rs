// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! User-visible events recorded against API objects.

use serde::{Deserialize, Serialize};

/// Pod matched more than one scheduling group.
pub const REASON_MULTIPLE_POD_SCHEDULING_GROUPS: &str = "MultiplePodSchedulingGroups";

/// A group's selector yielded no pods to roll up.
pub const REASON_NO_PODS: &str = "NoPods";

/// A reclaim unbind attempt failed.
pub const REASON_EVICTION_FAILED: &str = "EvictionFailed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Normal,
    Warning,
}

/// Reference to the object an event is recorded on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ObjectRef {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

/// Sink for user-visible events. The production implementation forwards to
/// the orchestrator's event API; tests capture events for inspection.
pub trait EventRecorder: Send + Sync {
    fn record(&self, object: &ObjectRef, kind: EventKind, reason: &str, message: &str);
}

/// Recorder that emits events into the tracing stream only.
#[derive(Debug, Default)]
pub struct TracingEventRecorder;

impl EventRecorder for TracingEventRecorder {
    fn record(&self, object: &ObjectRef, kind: EventKind, reason: &str, message: &str) {
        match kind {
            EventKind::Normal => tracing::info!(
                kind = %object.kind,
                object = %format!("{}/{}", object.namespace, object.name),
                reason,
                "{message}"
            ),
            EventKind::Warning => tracing::warn!(
                kind = %object.kind,
                object = %format!("{}/{}", object.namespace, object.name),
                reason,
                "{message}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_recorder_does_not_panic() {
        let recorder = TracingEventRecorder;
        let object = ObjectRef::new("Pod", "default", "web-0");
        recorder.record(&object, EventKind::Warning, REASON_NO_PODS, "no pods matched");
    }
}
