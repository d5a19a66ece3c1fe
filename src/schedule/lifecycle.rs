use std::{cmp::Ordering, sync::Arc, time::Duration};

use time::OffsetDateTime;

use crate::{
    config::EngineConfig,
    schedule::{
        detector::ConflictDetector,
        error::{ScheduleError, invalid_transition, not_found},
        locks::{KeyedLocks, LockKey},
        ports::{ConflictStore, TimeSlotCatalog},
        timeslots::order_time_slots,
        types::{
            AssignmentId, Conflict, ConflictId, ConflictOutcome, ConflictStatus, TimeSlot, UserId,
        },
    },
};

pub struct ConflictLifecycleManager {
    conflicts: Arc<dyn ConflictStore>,
    time_slots: Arc<dyn TimeSlotCatalog>,
    detector: ConflictDetector,
    locks: KeyedLocks,
    lock_timeout: Duration,
}

impl ConflictLifecycleManager {
    pub fn new(
        config: &EngineConfig,
        conflicts: Arc<dyn ConflictStore>,
        time_slots: Arc<dyn TimeSlotCatalog>,
        detector: ConflictDetector,
        locks: KeyedLocks,
    ) -> Self {
        Self {
            conflicts,
            time_slots,
            detector,
            locks,
            lock_timeout: config.lock_timeout(),
        }
    }

    /// Every conflict recorded against the assignment, whatever its status.
    pub async fn list_by_assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<Conflict>, ScheduleError> {
        let mut conflicts = self.conflicts.list_for_assignment(assignment_id).await?;
        conflicts.sort_by(severity_then_recency);
        Ok(conflicts)
    }

    pub async fn list_unresolved(&self) -> Result<Vec<Conflict>, ScheduleError> {
        let mut conflicts = self
            .conflicts
            .list_by_status(ConflictStatus::Detected)
            .await?;
        conflicts.sort_by(severity_then_recency);
        Ok(conflicts)
    }

    pub async fn count_unresolved(&self) -> Result<usize, ScheduleError> {
        Ok(self
            .conflicts
            .list_by_status(ConflictStatus::Detected)
            .await?
            .len())
    }

    /// Moves a detected conflict into a terminal status.
    pub async fn resolve(
        &self,
        conflict_id: ConflictId,
        outcome: ConflictOutcome,
        resolved_by: Option<UserId>,
    ) -> Result<Conflict, ScheduleError> {
        let _row = self
            .locks
            .acquire([LockKey::Conflict(conflict_id)], self.lock_timeout)
            .await?;
        let mut conflict = self
            .conflicts
            .get(&conflict_id)
            .await?
            .ok_or_else(|| not_found(format!("conflict '{conflict_id}' not found")))?;

        if conflict.status != ConflictStatus::Detected {
            return Err(invalid_transition(format!(
                "conflict '{}' cannot move from {:?} to {:?}",
                conflict_id,
                conflict.status,
                ConflictStatus::from(outcome)
            ))
            .with_key(format!("conflict:{conflict_id}")));
        }

        let now = OffsetDateTime::now_utc();
        conflict.status = outcome.into();
        conflict.resolved_by = resolved_by;
        conflict.resolved_at = Some(now);
        conflict.updated_at = now;
        self.conflicts.update(conflict.clone()).await?;

        tracing::info!(
            target: "lifecycle",
            conflict_id = %conflict_id,
            status = ?conflict.status,
            "conflict_closed"
        );
        Ok(conflict)
    }

    /// Catalogue slots where neither the teacher nor the classroom is held,
    /// other than `current_time_slot_id`, ordered by day then start time.
    pub async fn suggest_alternatives(
        &self,
        teacher_id: &str,
        classroom_id: &str,
        current_time_slot_id: &str,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        let mut candidates = self.time_slots.list().await?;
        order_time_slots(&mut candidates);

        let mut free = Vec::new();
        for slot in candidates {
            if slot.id == current_time_slot_id {
                continue;
            }
            if self
                .detector
                .check_teacher_conflict(teacher_id, &slot.id, None)
                .await?
            {
                continue;
            }
            if self
                .detector
                .check_classroom_conflict(classroom_id, &slot.id, None)
                .await?
            {
                continue;
            }
            free.push(slot);
        }

        tracing::debug!(
            target: "lifecycle",
            teacher_id = %teacher_id,
            classroom_id = %classroom_id,
            suggestions = free.len(),
            "alternatives_suggested"
        );
        Ok(free)
    }
}

/// Severity descending, then creation time descending.
pub fn severity_then_recency(a: &Conflict, b: &Conflict) -> Ordering {
    b.severity
        .rank()
        .cmp(&a.severity.rank())
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}
