use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::EngineConfig,
    schedule::{
        audit::{AuditEvent, AuditOperation, AuditSink},
        coordinator::ConsistencyCoordinator,
        error::{ScheduleError, not_found},
        lifecycle::ConflictLifecycleManager,
        locks::KeyedLocks,
        memory::{InMemoryAssignmentStore, InMemoryConflictStore, InMemoryTimeSlotCatalog},
        persistence::ScheduleSnapshot,
        ports::{AssignmentStore, ConflictStore, TimeSlotCatalog},
        timeslots::TimeSlotRegistry,
        types::{
            Assignment, AssignmentDraft, AssignmentFilter, AssignmentId, AssignmentPatch,
            AssignmentStatus, Conflict, ConflictId, ConflictOutcome, DayOfWeek, ImportBatch,
            ImportRejection, ImportReport, TimeSlot, TimeSlotDraft, UserId,
        },
    },
};

/// Backing stores plus the lock table that serializes writes to them. Every
/// facade built over clones of the same stores shares one lock table.
#[derive(Clone)]
pub struct ScheduleStores {
    pub assignments: Arc<dyn AssignmentStore>,
    pub conflicts: Arc<dyn ConflictStore>,
    pub time_slots: Arc<dyn TimeSlotCatalog>,
    pub locks: KeyedLocks,
}

impl ScheduleStores {
    pub fn in_memory() -> Self {
        Self::from_snapshot(ScheduleSnapshot::default())
    }

    pub fn from_snapshot(snapshot: ScheduleSnapshot) -> Self {
        Self {
            assignments: Arc::new(InMemoryAssignmentStore::with_records(snapshot.assignments)),
            conflicts: Arc::new(InMemoryConflictStore::with_records(snapshot.conflicts)),
            time_slots: Arc::new(InMemoryTimeSlotCatalog::with_records(snapshot.time_slots)),
            locks: KeyedLocks::new(),
        }
    }
}

/// Inbound command and query surface. Every state-changing command emits one
/// audit event once it settles.
pub struct ScheduleFacade {
    stores: ScheduleStores,
    coordinator: ConsistencyCoordinator,
    lifecycle: ConflictLifecycleManager,
    time_slots: TimeSlotRegistry,
    audit: Arc<dyn AuditSink>,
}

impl ScheduleFacade {
    pub fn new(stores: ScheduleStores, config: &EngineConfig, audit: Arc<dyn AuditSink>) -> Self {
        let coordinator = ConsistencyCoordinator::new(
            config,
            Arc::clone(&stores.assignments),
            Arc::clone(&stores.conflicts),
            stores.locks.clone(),
        );
        let lifecycle = ConflictLifecycleManager::new(
            config,
            Arc::clone(&stores.conflicts),
            Arc::clone(&stores.time_slots),
            coordinator.detector().clone(),
            stores.locks.clone(),
        );
        let time_slots = TimeSlotRegistry::new(
            config,
            Arc::clone(&stores.time_slots),
            stores.locks.clone(),
        );

        Self {
            stores,
            coordinator,
            lifecycle,
            time_slots,
            audit,
        }
    }

    pub fn in_memory(config: &EngineConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self::new(ScheduleStores::in_memory(), config, audit)
    }

    pub fn from_snapshot(
        snapshot: ScheduleSnapshot,
        config: &EngineConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::new(ScheduleStores::from_snapshot(snapshot), config, audit)
    }

    /// Reads every store without locks.
    pub async fn snapshot(&self) -> Result<ScheduleSnapshot, ScheduleError> {
        Ok(ScheduleSnapshot {
            time_slots: self.time_slots.list().await?,
            assignments: self.coordinator.list(&AssignmentFilter::All).await?,
            conflicts: self.stores.conflicts.list_all().await?,
        })
    }

    pub async fn create_assignment(
        &self,
        draft: AssignmentDraft,
    ) -> Result<Assignment, ScheduleError> {
        let result = self.coordinator.submit_create(draft).await;
        self.emit(AuditOperation::CreateAssignment, None, &result, |assignment| {
            AuditEvent::succeeded(AuditOperation::CreateAssignment, assignment.id.to_string())
        });
        result
    }

    pub async fn update_assignment(
        &self,
        id: AssignmentId,
        patch: AssignmentPatch,
    ) -> Result<Assignment, ScheduleError> {
        let result = self.coordinator.submit_update(id, patch).await;
        self.emit(AuditOperation::UpdateAssignment, Some(id), &result, |_| {
            AuditEvent::succeeded(AuditOperation::UpdateAssignment, id.to_string())
        });
        result
    }

    pub async fn cancel_assignment(&self, id: AssignmentId) -> Result<(), ScheduleError> {
        let result = self.coordinator.cancel(id).await;
        self.emit(AuditOperation::CancelAssignment, Some(id), &result, |_| {
            AuditEvent::succeeded(AuditOperation::CancelAssignment, id.to_string())
        });
        result
    }

    pub async fn get_assignment(&self, id: &AssignmentId) -> Result<Assignment, ScheduleError> {
        self.coordinator.get(id).await
    }

    pub async fn list_assignments_by_class(
        &self,
        class_id: &str,
    ) -> Result<Vec<Assignment>, ScheduleError> {
        self.coordinator
            .list(&AssignmentFilter::Class(class_id.to_string()))
            .await
    }

    pub async fn list_assignments_by_teacher(
        &self,
        teacher_id: &str,
    ) -> Result<Vec<Assignment>, ScheduleError> {
        self.coordinator
            .list(&AssignmentFilter::Teacher(teacher_id.to_string()))
            .await
    }

    pub async fn list_assignments_by_time_slot(
        &self,
        time_slot_id: &str,
    ) -> Result<Vec<Assignment>, ScheduleError> {
        self.coordinator
            .list(&AssignmentFilter::TimeSlot(time_slot_id.to_string()))
            .await
    }

    pub async fn list_assignments_by_classroom(
        &self,
        classroom_id: &str,
    ) -> Result<Vec<Assignment>, ScheduleError> {
        self.coordinator
            .list(&AssignmentFilter::Classroom(classroom_id.to_string()))
            .await
    }

    pub async fn list_assignments_by_status(
        &self,
        status: AssignmentStatus,
    ) -> Result<Vec<Assignment>, ScheduleError> {
        self.coordinator
            .list(&AssignmentFilter::Status(status))
            .await
    }

    /// Post-hoc scan of one assignment; records rather than rejects.
    pub async fn detect_conflicts(
        &self,
        assignment_id: AssignmentId,
    ) -> Result<Vec<Conflict>, ScheduleError> {
        let result = self
            .coordinator
            .submit_post_hoc_detection(assignment_id)
            .await;
        self.emit(
            AuditOperation::DetectConflicts,
            Some(assignment_id),
            &result,
            |conflicts| {
                AuditEvent::succeeded(AuditOperation::DetectConflicts, assignment_id.to_string())
                    .with_conflict_kinds(conflicts.iter().map(|conflict| conflict.kind))
            },
        );
        result
    }

    pub async fn resolve_conflict(
        &self,
        conflict_id: ConflictId,
        outcome: ConflictOutcome,
        resolved_by: Option<UserId>,
    ) -> Result<Conflict, ScheduleError> {
        let result = self
            .lifecycle
            .resolve(conflict_id, outcome, resolved_by)
            .await;
        self.emit(
            AuditOperation::ResolveConflict,
            Some(conflict_id),
            &result,
            |conflict| {
                AuditEvent::succeeded(AuditOperation::ResolveConflict, conflict_id.to_string())
                    .with_conflict_kinds([conflict.kind])
            },
        );
        result
    }

    pub async fn list_unresolved_conflicts(&self) -> Result<Vec<Conflict>, ScheduleError> {
        self.lifecycle.list_unresolved().await
    }

    pub async fn list_conflicts_for_assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<Conflict>, ScheduleError> {
        self.lifecycle.list_by_assignment(assignment_id).await
    }

    pub async fn count_unresolved_conflicts(&self) -> Result<usize, ScheduleError> {
        self.lifecycle.count_unresolved().await
    }

    pub async fn define_time_slot(&self, draft: TimeSlotDraft) -> Result<TimeSlot, ScheduleError> {
        let result = self.time_slots.define(draft).await;
        match &result {
            Ok(slot) => self.audit.on_event(AuditEvent::succeeded(
                AuditOperation::DefineTimeSlot,
                slot.id.clone(),
            )),
            Err(err) => self.audit.on_event(AuditEvent::failed(
                AuditOperation::DefineTimeSlot,
                None,
                err.kind,
                err.conflict_kinds.clone(),
            )),
        }
        result
    }

    pub async fn get_time_slot(&self, id: &str) -> Result<TimeSlot, ScheduleError> {
        self.time_slots.get(id).await
    }

    pub async fn list_time_slots(&self) -> Result<Vec<TimeSlot>, ScheduleError> {
        self.time_slots.list().await
    }

    pub async fn list_time_slots_by_day(
        &self,
        day: DayOfWeek,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        self.time_slots.list_by_day(day).await
    }

    pub async fn suggest_alternative_time_slots(
        &self,
        teacher_id: &str,
        classroom_id: &str,
        current_time_slot_id: &str,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        self.lifecycle
            .suggest_alternatives(teacher_id, classroom_id, current_time_slot_id)
            .await
    }

    /// Alternatives for the assignment a recorded conflict points at.
    pub async fn suggest_alternatives_for_conflict(
        &self,
        conflict_id: &ConflictId,
    ) -> Result<Vec<TimeSlot>, ScheduleError> {
        let conflict = self
            .stores
            .conflicts
            .get(conflict_id)
            .await?
            .ok_or_else(|| not_found(format!("conflict '{conflict_id}' not found")))?;
        let assignment = self.coordinator.get(&conflict.assignment_id).await?;
        self.lifecycle
            .suggest_alternatives(
                &assignment.teacher_id,
                &assignment.classroom_id,
                &assignment.time_slot_id,
            )
            .await
    }

    /// Corrective bulk load. Slots are defined first; assignments are then
    /// persisted even when they double-book, with each collision recorded as a
    /// conflict. Entries that fail validation are reported, not fatal.
    pub async fn import_assignments(
        &self,
        batch: ImportBatch,
    ) -> Result<ImportReport, ScheduleError> {
        let import_id = Uuid::now_v7();
        let mut report = ImportReport::default();

        for (index, draft) in batch.time_slots.into_iter().enumerate() {
            match self.time_slots.define(draft).await {
                Ok(slot) => report.time_slots.push(slot),
                Err(err) => report.rejected.push(rejection(
                    format!("time_slots[{index}]"),
                    &err,
                )),
            }
        }

        for (index, draft) in batch.assignments.into_iter().enumerate() {
            match self.coordinator.submit_corrective(draft).await {
                Ok((assignment, conflicts)) => {
                    report.assignments.push(assignment);
                    report.conflicts.extend(conflicts);
                }
                Err(err) if err.retryable => {
                    self.audit.on_event(AuditEvent::failed(
                        AuditOperation::Import,
                        Some(import_id.to_string()),
                        err.kind,
                        Vec::new(),
                    ));
                    return Err(err);
                }
                Err(err) => report.rejected.push(rejection(
                    format!("assignments[{index}]"),
                    &err,
                )),
            }
        }

        tracing::info!(
            target: "coordinator",
            import_id = %import_id,
            time_slots = report.time_slots.len(),
            assignments = report.assignments.len(),
            conflicts = report.conflicts.len(),
            rejected = report.rejected.len(),
            "import_completed"
        );
        self.audit.on_event(
            AuditEvent::succeeded(AuditOperation::Import, import_id.to_string())
                .with_conflict_kinds(report.conflicts.iter().map(|conflict| conflict.kind)),
        );
        Ok(report)
    }

    fn emit<T>(
        &self,
        operation: AuditOperation,
        subject_id: Option<Uuid>,
        result: &Result<T, ScheduleError>,
        on_success: impl FnOnce(&T) -> AuditEvent,
    ) {
        let event = match result {
            Ok(value) => on_success(value),
            Err(err) => AuditEvent::failed(
                operation,
                subject_id.map(|id| id.to_string()),
                err.kind,
                err.conflict_kinds.clone(),
            ),
        };
        self.audit.on_event(event);
    }
}

fn rejection(entry: String, err: &ScheduleError) -> ImportRejection {
    ImportRejection {
        entry,
        kind: err.kind,
        reason: err.message.clone(),
    }
}
