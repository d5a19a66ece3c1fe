use std::{sync::Arc, time::Duration};

use uuid::Uuid;

use crate::{
    config::EngineConfig,
    schedule::{
        error::{ScheduleError, StoreError, not_found, validation_error},
        locks::{KeyedLocks, LockKey},
        ports::TimeSlotCatalog,
        types::{DayOfWeek, TimeSlot, TimeSlotDraft},
    },
};

/// Owns slot definitions. Slots on the same day may not overlap.
pub struct TimeSlotRegistry {
    catalog: Arc<dyn TimeSlotCatalog>,
    locks: KeyedLocks,
    lock_timeout: Duration,
}

impl TimeSlotRegistry {
    pub fn new(
        config: &EngineConfig,
        catalog: Arc<dyn TimeSlotCatalog>,
        locks: KeyedLocks,
    ) -> Self {
        Self {
            catalog,
            locks,
            lock_timeout: config.lock_timeout(),
        }
    }

    pub async fn define(&self, draft: TimeSlotDraft) -> Result<TimeSlot, ScheduleError> {
        if draft.start >= draft.end {
            return Err(validation_error(format!(
                "time slot start {} must be before end {}",
                draft.start, draft.end
            )));
        }
        if draft.id.as_deref().is_some_and(|id| id.trim().is_empty()) {
            return Err(validation_error("time slot id must not be blank"));
        }

        let slot = TimeSlot {
            id: draft.id.unwrap_or_else(|| Uuid::now_v7().to_string()),
            day: draft.day,
            start: draft.start,
            end: draft.end,
            label: draft.label,
        };
        let _scope = self
            .locks
            .acquire(
                [LockKey::Day(slot.day), LockKey::TimeSlot(slot.id.clone())],
                self.lock_timeout,
            )
            .await?;

        let existing = self.catalog.list().await?;
        if existing.iter().any(|other| other.id == slot.id) {
            return Err(validation_error(format!(
                "time slot '{}' is already defined",
                slot.id
            )));
        }
        if let Some(other) = existing.iter().find(|other| other.overlaps(&slot)) {
            return Err(validation_error(format!(
                "time slot overlaps with existing time slot '{}'",
                other.id
            ))
            .with_key(other.id.clone()));
        }

        match self.catalog.insert(slot.clone()).await {
            Ok(()) => {}
            Err(StoreError::Duplicate { .. }) => {
                return Err(validation_error(format!(
                    "time slot '{}' is already defined",
                    slot.id
                )));
            }
            Err(err) => return Err(err.into()),
        }
        tracing::info!(
            target: "timeslots",
            time_slot_id = %slot.id,
            day = ?slot.day,
            "time_slot_defined"
        );
        Ok(slot)
    }

    pub async fn get(&self, id: &str) -> Result<TimeSlot, ScheduleError> {
        self.catalog
            .get(id)
            .await?
            .ok_or_else(|| not_found(format!("time slot '{id}' not found")))
    }

    pub async fn list(&self) -> Result<Vec<TimeSlot>, ScheduleError> {
        let mut slots = self.catalog.list().await?;
        order_time_slots(&mut slots);
        Ok(slots)
    }

    pub async fn list_by_day(&self, day: DayOfWeek) -> Result<Vec<TimeSlot>, ScheduleError> {
        let mut slots = self.list().await?;
        slots.retain(|slot| slot.day == day);
        Ok(slots)
    }
}

pub fn order_time_slots(slots: &mut [TimeSlot]) {
    slots.sort_by(|a, b| {
        a.day
            .cmp(&b.day)
            .then_with(|| a.start.cmp(&b.start))
            .then_with(|| a.id.cmp(&b.id))
    });
}
