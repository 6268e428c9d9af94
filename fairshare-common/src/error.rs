// Copyright 2025 The Fairshare Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//  http://www.apache.org/licenses/LICENSE-2.0

//! Error types shared by every fairshare component.

use std::fmt;

/// The failure classes the arbitrator distinguishes.
///
/// Retry policy hangs off the kind: `NotFound` is treated as success by
/// delete-shaped operations, `Conflict` is refetch-and-retry with a bounded
/// attempt count, `Transient` retries with backoff, `Validation` is
/// surfaced to the user via an event, and `Invariant` is logged at error
/// and the offending item skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Transient,
    Validation,
    Invariant,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::Transient => "Transient",
            Self::Validation => "Validation",
            Self::Invariant => "Invariant",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The primary error type for fairshare operations.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FairshareError {
    pub kind: ErrorKind,
    pub message: String,
}

impl FairshareError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, msg)
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, msg)
    }
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, msg)
    }
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, msg)
    }
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invariant, msg)
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }
    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }
}

/// Convenience alias used across the workspace.
pub type FairshareResult<T> = Result<T, FairshareError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = FairshareError::conflict("resource version mismatch");
        assert_eq!(err.to_string(), "Conflict: resource version mismatch");
    }

    #[test]
    fn test_predicates() {
        assert!(FairshareError::not_found("gone").is_not_found());
        assert!(FairshareError::transient("503").is_transient());
        assert!(!FairshareError::validation("bad").is_transient());
    }
}
