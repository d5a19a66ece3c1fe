use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schedule::types::ConflictKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleErrorKind {
    Validation,
    Conflict,
    NotFound,
    InvalidTransition,
    Timeout,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleError {
    pub kind: ScheduleErrorKind,
    pub message: String,
    #[serde(default)]
    pub conflict_kinds: Vec<ConflictKind>,
    #[serde(default)]
    pub key: Option<String>,
    pub retryable: bool,
}

impl ScheduleError {
    pub fn new(kind: ScheduleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            conflict_kinds: Vec::new(),
            key: None,
            retryable: matches!(kind, ScheduleErrorKind::Timeout | ScheduleErrorKind::Store),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_conflict_kind(mut self, kind: ConflictKind) -> Self {
        self.conflict_kinds.push(kind);
        self
    }

    /// First conflict kind carried by a `Conflict` error.
    pub fn conflict_kind(&self) -> Option<ConflictKind> {
        self.conflict_kinds.first().copied()
    }
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{} (key={})", self.message, key),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Failure reported by a store adapter. Surfaced to callers unchanged as a
/// `Store` schedule error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store is unavailable: {0}")]
    Unavailable(String),
    #[error("duplicate {entity} id '{id}'")]
    Duplicate { entity: &'static str, id: String },
    #[error("{entity} '{id}' is missing from the store")]
    Missing { entity: &'static str, id: String },
    #[error("snapshot failure: {0}")]
    Snapshot(String),
}

impl From<StoreError> for ScheduleError {
    fn from(err: StoreError) -> Self {
        store_error(err.to_string())
    }
}

pub fn validation_error(message: impl Into<String>) -> ScheduleError {
    ScheduleError::new(ScheduleErrorKind::Validation, message)
}

pub fn conflict_error(kind: ConflictKind, key: impl Into<String>) -> ScheduleError {
    ScheduleError::new(ScheduleErrorKind::Conflict, kind.rejection_message())
        .with_conflict_kind(kind)
        .with_key(key)
}

pub fn not_found(message: impl Into<String>) -> ScheduleError {
    ScheduleError::new(ScheduleErrorKind::NotFound, message)
}

pub fn invalid_transition(message: impl Into<String>) -> ScheduleError {
    ScheduleError::new(ScheduleErrorKind::InvalidTransition, message)
}

pub fn timeout_error(message: impl Into<String>) -> ScheduleError {
    ScheduleError::new(ScheduleErrorKind::Timeout, message)
}

pub fn store_error(message: impl Into<String>) -> ScheduleError {
    ScheduleError::new(ScheduleErrorKind::Store, message)
}
