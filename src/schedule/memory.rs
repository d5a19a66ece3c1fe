use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::schedule::{
    error::StoreError,
    ports::{AssignmentStore, ConflictStore, ResourceQuery, TimeSlotCatalog},
    types::{
        Assignment, AssignmentFilter, AssignmentId, Conflict, ConflictId, ConflictStatus,
        TimeSlot, TimeSlotId,
    },
};

#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    records: RwLock<BTreeMap<AssignmentId, Assignment>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = Assignment>) -> Self {
        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|assignment| (assignment.id, assignment))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn insert(&self, assignment: Assignment) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&assignment.id) {
            return Err(StoreError::Duplicate {
                entity: "assignment",
                id: assignment.id.to_string(),
            });
        }
        records.insert(assignment.id, assignment);
        Ok(())
    }

    async fn update(&self, assignment: Assignment) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let slot = records
            .get_mut(&assignment.id)
            .ok_or_else(|| StoreError::Missing {
                entity: "assignment",
                id: assignment.id.to_string(),
            })?;
        *slot = assignment;
        Ok(())
    }

    async fn get(&self, id: &AssignmentId) -> Result<Option<Assignment>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn exists_active(&self, query: &ResourceQuery<'_>) -> Result<bool, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .any(|assignment| query.matches(assignment)))
    }

    async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|assignment| filter.matches(assignment))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryConflictStore {
    records: RwLock<BTreeMap<ConflictId, Conflict>>,
}

impl InMemoryConflictStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = Conflict>) -> Self {
        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|conflict| (conflict.id, conflict))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl ConflictStore for InMemoryConflictStore {
    async fn insert_many(&self, conflicts: Vec<Conflict>) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(duplicate) = conflicts
            .iter()
            .find(|conflict| records.contains_key(&conflict.id))
        {
            return Err(StoreError::Duplicate {
                entity: "conflict",
                id: duplicate.id.to_string(),
            });
        }
        records.extend(conflicts.into_iter().map(|conflict| (conflict.id, conflict)));
        Ok(())
    }

    async fn update(&self, conflict: Conflict) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        let slot = records
            .get_mut(&conflict.id)
            .ok_or_else(|| StoreError::Missing {
                entity: "conflict",
                id: conflict.id.to_string(),
            })?;
        *slot = conflict;
        Ok(())
    }

    async fn get(&self, id: &ConflictId) -> Result<Option<Conflict>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list_for_assignment(
        &self,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<Conflict>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|conflict| &conflict.assignment_id == assignment_id)
            .cloned()
            .collect())
    }

    async fn list_by_status(&self, status: ConflictStatus) -> Result<Vec<Conflict>, StoreError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|conflict| conflict.status == status)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Conflict>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryTimeSlotCatalog {
    records: RwLock<BTreeMap<TimeSlotId, TimeSlot>>,
}

impl InMemoryTimeSlotCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = TimeSlot>) -> Self {
        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|time_slot| (time_slot.id.clone(), time_slot))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl TimeSlotCatalog for InMemoryTimeSlotCatalog {
    async fn insert(&self, time_slot: TimeSlot) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if records.contains_key(&time_slot.id) {
            return Err(StoreError::Duplicate {
                entity: "time slot",
                id: time_slot.id,
            });
        }
        records.insert(time_slot.id.clone(), time_slot);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<TimeSlot>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<TimeSlot>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
