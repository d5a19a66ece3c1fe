use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tokio::time::Instant;
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::EngineConfig,
    schedule::{
        detector::ConflictDetector,
        error::{ScheduleError, conflict_error, not_found, validation_error},
        locks::{KeyedLocks, LockKey, LockScope},
        ports::{AssignmentStore, ConflictStore},
        types::{
            Assignment, AssignmentDraft, AssignmentFilter, AssignmentId, AssignmentPatch,
            AssignmentStatus, Conflict, ConflictSeverity, ResourceKind,
        },
    },
};

/// Sole writer of assignments. Every check-then-write runs while holding the
/// contended keys it reads.
#[derive(Clone)]
pub struct ConsistencyCoordinator {
    assignments: Arc<dyn AssignmentStore>,
    conflicts: Arc<dyn ConflictStore>,
    detector: ConflictDetector,
    locks: KeyedLocks,
    lock_timeout: Duration,
    detection_severity: ConflictSeverity,
}

impl ConsistencyCoordinator {
    pub fn new(
        config: &EngineConfig,
        assignments: Arc<dyn AssignmentStore>,
        conflicts: Arc<dyn ConflictStore>,
        locks: KeyedLocks,
    ) -> Self {
        Self {
            detector: ConflictDetector::new(Arc::clone(&assignments)),
            assignments,
            conflicts,
            locks,
            lock_timeout: config.lock_timeout(),
            detection_severity: config.detection_severity,
        }
    }

    pub fn detector(&self) -> &ConflictDetector {
        &self.detector
    }

    pub async fn submit_create(&self, draft: AssignmentDraft) -> Result<Assignment, ScheduleError> {
        let candidate = materialize(draft, OffsetDateTime::now_utc())?;
        let _scope = self
            .lock_resources(
                &candidate,
                &ResourceKind::CHECK_ORDER,
                Instant::now() + self.lock_timeout,
            )
            .await?;

        if let Some(kind) = self
            .detector
            .first_violation(&candidate, &ResourceKind::CHECK_ORDER)
            .await?
        {
            let key = LockKey::resource(kind, &candidate).to_string();
            tracing::info!(
                target: "coordinator",
                conflict_kind = %kind.conflict_kind(),
                key = %key,
                "create_rejected"
            );
            return Err(conflict_error(kind.conflict_kind(), key));
        }

        self.assignments.insert(candidate.clone()).await?;
        tracing::info!(
            target: "coordinator",
            assignment_id = %candidate.id,
            time_slot_id = %candidate.time_slot_id,
            "assignment_created"
        );
        Ok(candidate)
    }

    pub async fn submit_update(
        &self,
        id: AssignmentId,
        patch: AssignmentPatch,
    ) -> Result<Assignment, ScheduleError> {
        let deadline = Instant::now() + self.lock_timeout;
        let _row = self
            .locks
            .acquire_until([LockKey::Assignment(id)], deadline)
            .await?;
        let current = self.load(&id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let mut next = patch.apply_to(&current);
        let dimensions = recheck_dimensions(&current, &next);
        let _scope = if dimensions.is_empty() {
            None
        } else {
            Some(self.lock_resources(&next, &dimensions, deadline).await?)
        };

        if let Some(kind) = self.detector.first_violation(&next, &dimensions).await? {
            let key = LockKey::resource(kind, &next).to_string();
            tracing::info!(
                target: "coordinator",
                assignment_id = %id,
                conflict_kind = %kind.conflict_kind(),
                key = %key,
                "update_rejected"
            );
            return Err(conflict_error(kind.conflict_kind(), key));
        }

        next.updated_at = OffsetDateTime::now_utc();
        self.assignments.update(next.clone()).await?;
        tracing::info!(
            target: "coordinator",
            assignment_id = %id,
            rechecked = ?dimensions,
            "assignment_updated"
        );
        Ok(next)
    }

    /// Soft-deletes the assignment. Conflicts referencing it are left as they are.
    pub async fn cancel(&self, id: AssignmentId) -> Result<(), ScheduleError> {
        let _row = self
            .locks
            .acquire([LockKey::Assignment(id)], self.lock_timeout)
            .await?;
        let mut current = self.load(&id).await?;
        if current.status == AssignmentStatus::Cancelled {
            return Ok(());
        }

        current.status = AssignmentStatus::Cancelled;
        current.updated_at = OffsetDateTime::now_utc();
        self.assignments.update(current).await?;
        tracing::info!(target: "coordinator", assignment_id = %id, "assignment_cancelled");
        Ok(())
    }

    /// Records (without blocking anything) one conflict per invariant the
    /// assignment currently violates.
    pub async fn submit_post_hoc_detection(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Conflict>, ScheduleError> {
        let assignment = self.load(&assignment_id).await?;
        let conflicts = self.detect_conflicts(&assignment).await?;
        self.record_conflicts(&assignment, &conflicts).await?;
        Ok(conflicts)
    }

    /// Corrective write path: persists the draft as active even when it
    /// double-books, together with a conflict per collision. If the conflicts
    /// cannot be stored the row is cancelled again, so no unrecorded double
    /// booking is left active.
    pub async fn submit_corrective(
        &self,
        draft: AssignmentDraft,
    ) -> Result<(Assignment, Vec<Conflict>), ScheduleError> {
        let candidate = materialize(draft, OffsetDateTime::now_utc())?;
        let _scope = self
            .lock_resources(
                &candidate,
                &ResourceKind::CHECK_ORDER,
                Instant::now() + self.lock_timeout,
            )
            .await?;

        let conflicts = self.detect_conflicts(&candidate).await?;
        self.assignments.insert(candidate.clone()).await?;
        if let Err(err) = self.record_conflicts(&candidate, &conflicts).await {
            self.withdraw(&candidate).await;
            return Err(err);
        }
        Ok((candidate, conflicts))
    }

    pub async fn get(&self, id: &AssignmentId) -> Result<Assignment, ScheduleError> {
        self.load(id).await
    }

    /// Newest first.
    pub async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, ScheduleError> {
        let mut assignments = self.assignments.list(filter).await?;
        assignments.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(assignments)
    }

    async fn detect_conflicts(
        &self,
        assignment: &Assignment,
    ) -> Result<Vec<Conflict>, ScheduleError> {
        let now = OffsetDateTime::now_utc();
        Ok(self
            .detector
            .detect_all(assignment)
            .await?
            .into_iter()
            .map(|kind| Conflict::detected(assignment.id, kind, self.detection_severity, now))
            .collect())
    }

    async fn record_conflicts(
        &self,
        assignment: &Assignment,
        conflicts: &[Conflict],
    ) -> Result<(), ScheduleError> {
        if conflicts.is_empty() {
            return Ok(());
        }

        self.conflicts.insert_many(conflicts.to_vec()).await?;
        for conflict in conflicts {
            tracing::warn!(
                target: "coordinator",
                assignment_id = %assignment.id,
                conflict_id = %conflict.id,
                conflict_kind = %conflict.kind,
                "conflict_recorded"
            );
        }
        Ok(())
    }

    /// Takes a freshly inserted row out of the active set after a failed
    /// corrective write.
    async fn withdraw(&self, assignment: &Assignment) {
        let mut withdrawn = assignment.clone();
        withdrawn.status = AssignmentStatus::Cancelled;
        withdrawn.updated_at = OffsetDateTime::now_utc();
        match self.assignments.update(withdrawn).await {
            Ok(()) => tracing::warn!(
                target: "coordinator",
                assignment_id = %assignment.id,
                "corrective_write_withdrawn"
            ),
            Err(err) => tracing::error!(
                target: "coordinator",
                assignment_id = %assignment.id,
                error = %err,
                "corrective_write_withdraw_failed"
            ),
        }
    }

    async fn lock_resources(
        &self,
        assignment: &Assignment,
        dimensions: &[ResourceKind],
        deadline: Instant,
    ) -> Result<LockScope, ScheduleError> {
        self.locks
            .acquire_until(
                dimensions
                    .iter()
                    .map(|kind| LockKey::resource(*kind, assignment)),
                deadline,
            )
            .await
    }

    async fn load(&self, id: &AssignmentId) -> Result<Assignment, ScheduleError> {
        self.assignments
            .get(id)
            .await?
            .ok_or_else(|| not_found(format!("assignment '{id}' not found")))
    }
}

/// Dimensions whose `(resource, slot)` pair the patch moves into. A row that
/// ends up non-active needs no checks; a row that becomes active needs all.
pub fn recheck_dimensions(current: &Assignment, next: &Assignment) -> Vec<ResourceKind> {
    if !next.is_active() {
        return Vec::new();
    }
    if !current.is_active() {
        return ResourceKind::CHECK_ORDER.to_vec();
    }

    let slot_changed = current.time_slot_id != next.time_slot_id;
    ResourceKind::CHECK_ORDER
        .into_iter()
        .filter(|kind| slot_changed || current.resource_id(*kind) != next.resource_id(*kind))
        .collect()
}

fn materialize(draft: AssignmentDraft, now: OffsetDateTime) -> Result<Assignment, ScheduleError> {
    if let Err(errors) = draft.validate() {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        return Err(validation_error(format!(
            "all required fields must be provided: {}",
            fields.join(", ")
        )));
    }

    let AssignmentDraft {
        class_id: Some(class_id),
        teacher_id: Some(teacher_id),
        subject_id: Some(subject_id),
        lesson_id: Some(lesson_id),
        time_slot_id: Some(time_slot_id),
        classroom_id: Some(classroom_id),
        created_by: Some(created_by),
        kind,
    } = draft
    else {
        return Err(validation_error("all required fields must be provided"));
    };

    Ok(Assignment {
        id: Uuid::now_v7(),
        class_id,
        teacher_id,
        subject_id,
        lesson_id,
        time_slot_id,
        classroom_id,
        kind: kind.unwrap_or_default(),
        status: AssignmentStatus::Active,
        created_by,
        created_at: now,
        updated_at: now,
    })
}
