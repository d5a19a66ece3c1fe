use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    time::Instant,
};

use crate::schedule::{
    error::{ScheduleError, timeout_error},
    types::{Assignment, AssignmentId, ConflictId, DayOfWeek, ResourceKind},
};

/// A contended key: whoever holds it may run check-then-write for that key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    Resource {
        kind: ResourceKind,
        resource_id: String,
        time_slot_id: String,
    },
    Assignment(AssignmentId),
    Conflict(ConflictId),
    Day(DayOfWeek),
    TimeSlot(String),
}

impl LockKey {
    pub fn resource(kind: ResourceKind, assignment: &Assignment) -> Self {
        Self::Resource {
            kind,
            resource_id: assignment.resource_id(kind).to_string(),
            time_slot_id: assignment.time_slot_id.clone(),
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource {
                kind,
                resource_id,
                time_slot_id,
            } => write!(f, "{}:{}@{}", kind.as_str(), resource_id, time_slot_id),
            Self::Assignment(id) => write!(f, "assignment:{id}"),
            Self::Conflict(id) => write!(f, "conflict:{id}"),
            Self::Day(day) => write!(f, "day:{day:?}"),
            Self::TimeSlot(id) => write!(f, "time_slot:{id}"),
        }
    }
}

/// Process-local keyed mutex table. Entries exist only while some scope holds
/// or waits on them.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    table: Arc<StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>>,
}

/// Held keys. Dropping the scope releases every key and prunes idle entries.
pub struct LockScope {
    keys: Vec<LockKey>,
    guards: Vec<OwnedMutexGuard<()>>,
    table: Arc<StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>>,
}

impl LockScope {
    pub fn keys(&self) -> &[LockKey] {
        &self.keys
    }
}

impl Drop for LockScope {
    fn drop(&mut self) {
        self.guards.clear();
        prune(&self.table, &self.keys);
    }
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires all `keys` in sorted order, bounded by `wait`. On timeout every
    /// key taken so far is released and a retryable `Timeout` error is returned.
    pub async fn acquire(
        &self,
        keys: impl IntoIterator<Item = LockKey>,
        wait: Duration,
    ) -> Result<LockScope, ScheduleError> {
        self.acquire_until(keys, Instant::now() + wait).await
    }

    /// Same as `acquire`, bounded by an absolute deadline so that several
    /// scopes taken in sequence share one wait budget.
    pub async fn acquire_until(
        &self,
        keys: impl IntoIterator<Item = LockKey>,
        deadline: Instant,
    ) -> Result<LockScope, ScheduleError> {
        let started = Instant::now();
        let keys: Vec<LockKey> = keys.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        let mutexes: Vec<Arc<Mutex<()>>> = {
            let mut table = self.table.lock().expect("lock poisoned");
            keys.iter()
                .map(|key| Arc::clone(table.entry(key.clone()).or_default()))
                .collect()
        };

        let acquired = tokio::time::timeout_at(deadline, async move {
            let mut guards = Vec::with_capacity(mutexes.len());
            for mutex in mutexes {
                guards.push(mutex.lock_owned().await);
            }
            guards
        })
        .await;

        match acquired {
            Ok(guards) => Ok(LockScope {
                keys,
                guards,
                table: Arc::clone(&self.table),
            }),
            Err(_) => {
                prune(&self.table, &keys);
                let wait = deadline.saturating_duration_since(started);
                let described = keys
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                tracing::warn!(
                    target: "locks",
                    keys = %described,
                    wait_ms = wait.as_millis() as u64,
                    "lock_wait_timed_out"
                );
                Err(timeout_error(format!(
                    "timed out after {}ms waiting for contended keys",
                    wait.as_millis()
                ))
                .with_key(described))
            }
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.table.lock().expect("lock poisoned").len()
    }
}

fn prune(table: &StdMutex<HashMap<LockKey, Arc<Mutex<()>>>>, keys: &[LockKey]) {
    let mut table = table.lock().expect("lock poisoned");
    for key in keys {
        if table
            .get(key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            table.remove(key);
        }
    }
}
