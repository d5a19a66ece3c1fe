use std::fmt;

use crate::schedule::{error::ScheduleErrorKind, types::ConflictKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOperation {
    CreateAssignment,
    UpdateAssignment,
    CancelAssignment,
    DetectConflicts,
    ResolveConflict,
    DefineTimeSlot,
    Import,
}

impl AuditOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateAssignment => "create_assignment",
            Self::UpdateAssignment => "update_assignment",
            Self::CancelAssignment => "cancel_assignment",
            Self::DetectConflicts => "detect_conflicts",
            Self::ResolveConflict => "resolve_conflict",
            Self::DefineTimeSlot => "define_time_slot",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for AuditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Succeeded,
    Failed { kind: ScheduleErrorKind },
}

/// One record per state-changing command, written after the command settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    pub operation: AuditOperation,
    pub subject_id: Option<String>,
    pub outcome: AuditOutcome,
    pub conflict_kinds: Vec<ConflictKind>,
}

impl AuditEvent {
    pub fn succeeded(operation: AuditOperation, subject_id: impl Into<Option<String>>) -> Self {
        Self {
            operation,
            subject_id: subject_id.into(),
            outcome: AuditOutcome::Succeeded,
            conflict_kinds: Vec::new(),
        }
    }

    pub fn failed(
        operation: AuditOperation,
        subject_id: Option<String>,
        kind: ScheduleErrorKind,
        conflict_kinds: Vec<ConflictKind>,
    ) -> Self {
        Self {
            operation,
            subject_id,
            outcome: AuditOutcome::Failed { kind },
            conflict_kinds,
        }
    }

    pub fn with_conflict_kinds(mut self, kinds: impl IntoIterator<Item = ConflictKind>) -> Self {
        self.conflict_kinds.extend(kinds);
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn on_event(&self, event: AuditEvent);
}

#[derive(Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn on_event(&self, _event: AuditEvent) {}
}

/// Writes audit events into the structured log under the `audit` target.
#[derive(Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn on_event(&self, event: AuditEvent) {
        let subject_id = event.subject_id.as_deref().unwrap_or("-");
        match event.outcome {
            AuditOutcome::Succeeded => tracing::info!(
                target: "audit",
                operation = %event.operation,
                subject_id = %subject_id,
                conflict_kinds = ?event.conflict_kinds,
                "schedule_command_succeeded"
            ),
            AuditOutcome::Failed { kind } => tracing::info!(
                target: "audit",
                operation = %event.operation,
                subject_id = %subject_id,
                error_kind = ?kind,
                conflict_kinds = ?event.conflict_kinds,
                "schedule_command_failed"
            ),
        }
    }
}
