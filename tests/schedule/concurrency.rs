use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::future::join_all;
use slotguard::{
    config::EngineConfig,
    schedule::{
        Assignment, AssignmentFilter, AssignmentId, AssignmentPatch, AssignmentStore, ConflictKind,
        DayOfWeek, InMemoryAssignmentStore, NoopAuditSink, ResourceQuery, ScheduleErrorKind,
        ScheduleFacade, ScheduleStores, StoreError, TimeSlotDraft, assert_schedule_invariants,
    },
};
use time::macros::time;

use crate::support::{MON_0900, TUE_0900, draft, facade};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_two_racing_creates_for_same_teacher_when_joined_then_exactly_one_wins() {
    let facade = Arc::new(facade());

    let first = {
        let facade = Arc::clone(&facade);
        tokio::spawn(async move {
            facade
                .create_assignment(draft("C1", "T1", "S1", "L1", MON_0900, "R101"))
                .await
        })
    };
    let second = {
        let facade = Arc::clone(&facade);
        tokio::spawn(async move {
            facade
                .create_assignment(draft("C2", "T1", "S2", "L2", MON_0900, "R102"))
                .await
        })
    };

    let (first, second) = tokio::join!(first, second);
    let results = [
        first.expect("task should not panic"),
        second.expect("task should not panic"),
    ];

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    let err = results
        .iter()
        .find_map(|result| result.as_ref().err())
        .expect("one create must lose");
    assert_eq!(err.kind, ScheduleErrorKind::Conflict);
    assert_eq!(err.conflict_kind(), Some(ConflictKind::TeacherDouble));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_many_writers_on_one_classroom_when_raced_then_invariant_holds() {
    let facade = Arc::new(facade());

    let attempts = (0..16).map(|index| {
        let facade = Arc::clone(&facade);
        tokio::spawn(async move {
            facade
                .create_assignment(draft(
                    &format!("C{index}"),
                    &format!("T{index}"),
                    "S1",
                    "L1",
                    MON_0900,
                    "R101",
                ))
                .await
        })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic"))
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    assert!(results.iter().filter_map(|result| result.as_ref().err()).all(
        |err| err.conflict_kind() == Some(ConflictKind::ClassroomDouble)
    ));

    let snapshot = facade.snapshot().await.expect("snapshot should be read");
    assert_schedule_invariants(&snapshot.assignments).expect("no double booking");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_update_racing_create_into_same_slot_when_joined_then_one_is_rejected() {
    let facade = Arc::new(facade());
    let movable = facade
        .create_assignment(draft("C1", "T1", "S1", "L1", TUE_0900, "R101"))
        .await
        .expect("assignment should be created");

    let update = {
        let facade = Arc::clone(&facade);
        tokio::spawn(async move {
            facade
                .update_assignment(movable.id, AssignmentPatch::time_slot(MON_0900))
                .await
                .map(|_| ())
        })
    };
    let create = {
        let facade = Arc::clone(&facade);
        tokio::spawn(async move {
            facade
                .create_assignment(draft("C2", "T1", "S2", "L2", MON_0900, "R102"))
                .await
                .map(|_| ())
        })
    };

    let (update, create) = tokio::join!(update, create);
    let outcomes = [
        update.expect("task should not panic"),
        create.expect("task should not panic"),
    ];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);

    let snapshot = facade.snapshot().await.expect("snapshot should be read");
    assert_schedule_invariants(&snapshot.assignments).expect("no double booking");
}

/// Widens the gap between the existence check and the insert.
struct SlowAssignmentStore {
    inner: InMemoryAssignmentStore,
    delay: Duration,
}

#[async_trait]
impl AssignmentStore for SlowAssignmentStore {
    async fn insert(&self, assignment: Assignment) -> Result<(), StoreError> {
        self.inner.insert(assignment).await
    }

    async fn update(&self, assignment: Assignment) -> Result<(), StoreError> {
        self.inner.update(assignment).await
    }

    async fn get(&self, id: &AssignmentId) -> Result<Option<Assignment>, StoreError> {
        self.inner.get(id).await
    }

    async fn exists_active(&self, query: &ResourceQuery<'_>) -> Result<bool, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.exists_active(query).await
    }

    async fn list(&self, filter: &AssignmentFilter) -> Result<Vec<Assignment>, StoreError> {
        self.inner.list(filter).await
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_two_facades_over_shared_stores_when_creates_race_then_exactly_one_wins() {
    let stores = ScheduleStores {
        assignments: Arc::new(SlowAssignmentStore {
            inner: InMemoryAssignmentStore::new(),
            delay: Duration::from_millis(50),
        }),
        ..ScheduleStores::in_memory()
    };
    let config = EngineConfig::default();
    let left = ScheduleFacade::new(stores.clone(), &config, Arc::new(NoopAuditSink));
    let right = ScheduleFacade::new(stores.clone(), &config, Arc::new(NoopAuditSink));

    let (first, second) = tokio::join!(
        left.create_assignment(draft("C1", "T1", "S1", "L1", MON_0900, "R101")),
        right.create_assignment(draft("C2", "T1", "S2", "L2", MON_0900, "R102")),
    );
    let results = [first, second];

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    let err = results
        .iter()
        .find_map(|result| result.as_ref().err())
        .expect("one create must lose");
    assert_eq!(err.conflict_kind(), Some(ConflictKind::TeacherDouble));

    let stored = stores
        .assignments
        .list(&AssignmentFilter::All)
        .await
        .expect("listing should succeed");
    assert_eq!(stored.len(), 1);
    assert_schedule_invariants(&stored).expect("no double booking");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn given_same_slot_id_on_different_days_when_defined_concurrently_then_loser_gets_validation()
{
    let facade = Arc::new(facade());

    let defines = [DayOfWeek::Monday, DayOfWeek::Tuesday].map(|day| {
        let facade = Arc::clone(&facade);
        tokio::spawn(async move {
            facade
                .define_time_slot(TimeSlotDraft {
                    id: Some("period-1".to_string()),
                    day,
                    start: time!(09:00),
                    end: time!(10:00),
                    label: None,
                })
                .await
        })
    });
    let results: Vec<_> = join_all(defines)
        .await
        .into_iter()
        .map(|joined| joined.expect("task should not panic"))
        .collect();

    assert_eq!(results.iter().filter(|result| result.is_ok()).count(), 1);
    let err = results
        .iter()
        .find_map(|result| result.as_ref().err())
        .expect("one define must lose");
    assert_eq!(err.kind, ScheduleErrorKind::Validation);
    assert!(!err.retryable);
    assert_eq!(
        facade
            .list_time_slots()
            .await
            .expect("listing should succeed")
            .len(),
        1
    );
}
