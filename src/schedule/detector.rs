use std::{collections::HashMap, sync::Arc};

use crate::schedule::{
    error::{ScheduleError, ScheduleErrorKind},
    ports::{AssignmentStore, ResourceQuery},
    types::{Assignment, AssignmentId, ConflictKind, ResourceKind},
};

/// Read-only double-booking predicates over the active assignment set.
#[derive(Clone)]
pub struct ConflictDetector {
    assignments: Arc<dyn AssignmentStore>,
}

impl ConflictDetector {
    pub fn new(assignments: Arc<dyn AssignmentStore>) -> Self {
        Self { assignments }
    }

    pub async fn check(
        &self,
        kind: ResourceKind,
        resource_id: &str,
        time_slot_id: &str,
        exclude: Option<AssignmentId>,
    ) -> Result<bool, ScheduleError> {
        let query = ResourceQuery::new(kind, resource_id, time_slot_id).excluding(exclude);
        Ok(self.assignments.exists_active(&query).await?)
    }

    pub async fn check_teacher_conflict(
        &self,
        teacher_id: &str,
        time_slot_id: &str,
        exclude: Option<AssignmentId>,
    ) -> Result<bool, ScheduleError> {
        self.check(ResourceKind::Teacher, teacher_id, time_slot_id, exclude)
            .await
    }

    pub async fn check_classroom_conflict(
        &self,
        classroom_id: &str,
        time_slot_id: &str,
        exclude: Option<AssignmentId>,
    ) -> Result<bool, ScheduleError> {
        self.check(ResourceKind::Classroom, classroom_id, time_slot_id, exclude)
            .await
    }

    pub async fn check_class_conflict(
        &self,
        class_id: &str,
        time_slot_id: &str,
        exclude: Option<AssignmentId>,
    ) -> Result<bool, ScheduleError> {
        self.check(ResourceKind::Class, class_id, time_slot_id, exclude)
            .await
    }

    /// Evaluates `dimensions` in the given order and stops at the first one
    /// held by another active assignment.
    pub async fn first_violation(
        &self,
        candidate: &Assignment,
        dimensions: &[ResourceKind],
    ) -> Result<Option<ResourceKind>, ScheduleError> {
        for &kind in dimensions {
            if self
                .check(
                    kind,
                    candidate.resource_id(kind),
                    &candidate.time_slot_id,
                    Some(candidate.id),
                )
                .await?
            {
                return Ok(Some(kind));
            }
        }
        Ok(None)
    }

    /// Every invariant `assignment` currently violates, in teacher, classroom,
    /// class order. Non-active assignments never violate anything.
    pub async fn detect_all(
        &self,
        assignment: &Assignment,
    ) -> Result<Vec<ConflictKind>, ScheduleError> {
        if !assignment.is_active() {
            return Ok(Vec::new());
        }

        let mut kinds = Vec::new();
        for kind in ResourceKind::CHECK_ORDER {
            if self
                .check(
                    kind,
                    assignment.resource_id(kind),
                    &assignment.time_slot_id,
                    Some(assignment.id),
                )
                .await?
            {
                kinds.push(kind.conflict_kind());
            }
        }
        Ok(kinds)
    }
}

/// Kinds on which two distinct active assignments collide.
pub fn colliding_kinds(a: &Assignment, b: &Assignment) -> Vec<ConflictKind> {
    if a.id == b.id || !a.is_active() || !b.is_active() || a.time_slot_id != b.time_slot_id {
        return Vec::new();
    }
    ResourceKind::CHECK_ORDER
        .into_iter()
        .filter(|kind| a.resource_id(*kind) == b.resource_id(*kind))
        .map(ResourceKind::conflict_kind)
        .collect()
}

/// Checks the no-double-booking invariant over a full assignment set.
pub fn assert_schedule_invariants(assignments: &[Assignment]) -> Result<(), ScheduleError> {
    let mut holders: HashMap<(ResourceKind, &str, &str), AssignmentId> = HashMap::new();
    for assignment in assignments.iter().filter(|assignment| assignment.is_active()) {
        for kind in ResourceKind::CHECK_ORDER {
            let key = (
                kind,
                assignment.resource_id(kind),
                assignment.time_slot_id.as_str(),
            );
            if let Some(existing) = holders.insert(key, assignment.id)
                && existing != assignment.id
            {
                return Err(ScheduleError::new(
                    ScheduleErrorKind::Conflict,
                    format!(
                        "assignments '{}' and '{}' double-book {} '{}' in slot '{}'",
                        existing,
                        assignment.id,
                        kind.as_str(),
                        assignment.resource_id(kind),
                        assignment.time_slot_id
                    ),
                )
                .with_conflict_kind(kind.conflict_kind()));
            }
        }
    }
    Ok(())
}
