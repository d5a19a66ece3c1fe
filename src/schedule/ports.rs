use async_trait::async_trait;

use crate::schedule::{
    error::StoreError,
    types::{
        Assignment, AssignmentFilter, AssignmentId, Conflict, ConflictId, ConflictStatus,
        ResourceKind, TimeSlot,
    },
};

/// One double-booking question: is `resource_id` of `kind` held by an active
/// assignment in `time_slot_id`, ignoring `exclude`?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceQuery<'a> {
    pub kind: ResourceKind,
    pub resource_id: &'a str,
    pub time_slot_id: &'a str,
    pub exclude: Option<AssignmentId>,
}

impl<'a> ResourceQuery<'a> {
    pub fn new(kind: ResourceKind, resource_id: &'a str, time_slot_id: &'a str) -> Self {
        Self {
            kind,
            resource_id,
            time_slot_id,
            exclude: None,
        }
    }

    pub fn excluding(mut self, exclude: Option<AssignmentId>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn matches(&self, assignment: &Assignment) -> bool {
        assignment.is_active()
            && Some(assignment.id) != self.exclude
            && assignment.time_slot_id == self.time_slot_id
            && assignment.resource_id(self.kind) == self.resource_id
    }
}

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    async fn insert(&self, assignment: Assignment) -> Result<(), StoreError>;

    async fn update(&self, assignment: Assignment) -> Result<(), StoreError>;

    async fn get(&self, id: &AssignmentId) -> Result<Option<Assignment>, StoreError>;

    async fn exists_active(&self, query: &ResourceQuery<'_>) -> Result<bool, StoreError>;

    async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, StoreError>;
}

#[async_trait]
pub trait ConflictStore: Send + Sync {
    async fn insert_many(&self, conflicts: Vec<Conflict>) -> Result<(), StoreError>;

    async fn update(&self, conflict: Conflict) -> Result<(), StoreError>;

    async fn get(&self, id: &ConflictId) -> Result<Option<Conflict>, StoreError>;

    async fn list_for_assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<Conflict>, StoreError>;

    async fn list_by_status(&self, status: ConflictStatus) -> Result<Vec<Conflict>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Conflict>, StoreError>;
}

#[async_trait]
pub trait TimeSlotCatalog: Send + Sync {
    async fn insert(&self, time_slot: TimeSlot) -> Result<(), StoreError>;

    async fn get(&self, id: &str) -> Result<Option<TimeSlot>, StoreError>;

    async fn list(&self) -> Result<Vec<TimeSlot>, StoreError>;
}
