use slotguard::schedule::{
    AssignmentPatch, AssignmentStatus, ConflictKind, ConflictOutcome, ConflictStatus,
    ImportBatch, ScheduleErrorKind,
};

use crate::support::{MON_0900, TUE_0900, draft, facade};

#[tokio::test]
async fn given_teacher_booked_when_second_class_uses_same_slot_then_teacher_double() {
    let facade = facade();
    let first = facade
        .create_assignment(draft("C1", "T1", "S1", "L1", MON_0900, "R101"))
        .await
        .expect("first assignment should be created");
    assert_eq!(first.status, AssignmentStatus::Active);

    let err = facade
        .create_assignment(draft("C2", "T1", "S2", "L2", MON_0900, "R102"))
        .await
        .expect_err("teacher is already booked");
    assert_eq!(err.kind, ScheduleErrorKind::Conflict);
    assert_eq!(err.conflict_kind(), Some(ConflictKind::TeacherDouble));
    assert_eq!(
        facade
            .list_assignments_by_time_slot(MON_0900)
            .await
            .expect("listing should succeed")
            .len(),
        1
    );
}

#[tokio::test]
async fn given_class_booked_when_other_subject_uses_same_slot_then_class_double() {
    let facade = facade();
    facade
        .create_assignment(draft("C1", "T1", "S1", "L1", MON_0900, "R101"))
        .await
        .expect("first assignment should be created");

    let err = facade
        .create_assignment(draft("C1", "T2", "S2", "L2", MON_0900, "R102"))
        .await
        .expect_err("class is already booked");
    assert_eq!(err.kind, ScheduleErrorKind::Conflict);
    assert_eq!(err.conflict_kind(), Some(ConflictKind::ClassDouble));
}

#[tokio::test]
async fn given_free_target_slot_when_update_moves_assignment_then_new_slot_persisted() {
    let facade = facade();
    let created = facade
        .create_assignment(draft("C1", "T1", "S1", "L1", MON_0900, "R101"))
        .await
        .expect("assignment should be created");

    let updated = facade
        .update_assignment(created.id, AssignmentPatch::time_slot(TUE_0900))
        .await
        .expect("target slot is free");
    assert_eq!(updated.time_slot_id, TUE_0900);
    assert!(updated.updated_at >= created.updated_at);

    let stored = facade
        .get_assignment(&created.id)
        .await
        .expect("assignment should exist");
    assert_eq!(stored.time_slot_id, TUE_0900);
    assert_eq!(stored.created_at, created.created_at);
}

#[tokio::test]
async fn given_assignment_with_two_conflicts_when_cancelled_then_conflicts_stay_detected() {
    let facade = facade();
    let report = facade
        .import_assignments(ImportBatch {
            time_slots: Vec::new(),
            assignments: vec![
                draft("C1", "T1", "S1", "L1", MON_0900, "R101"),
                draft("C2", "T1", "S2", "L2", MON_0900, "R101"),
            ],
        })
        .await
        .expect("corrective import should succeed");
    let doubled = &report.assignments[1];
    assert_eq!(report.conflicts.len(), 2);

    facade
        .cancel_assignment(doubled.id)
        .await
        .expect("cancel should succeed");

    let conflicts = facade
        .list_conflicts_for_assignment(&doubled.id)
        .await
        .expect("conflicts should be listed");
    assert_eq!(conflicts.len(), 2);
    assert!(
        conflicts
            .iter()
            .all(|conflict| conflict.status == ConflictStatus::Detected)
    );
    assert_eq!(
        facade
            .get_assignment(&doubled.id)
            .await
            .expect("cancelled row is kept")
            .status,
        AssignmentStatus::Cancelled
    );
}

#[tokio::test]
async fn given_detected_conflict_when_resolved_twice_then_second_is_invalid_transition() {
    let facade = facade();
    let report = facade
        .import_assignments(ImportBatch {
            time_slots: Vec::new(),
            assignments: vec![
                draft("C1", "T1", "S1", "L1", MON_0900, "R101"),
                draft("C2", "T1", "S2", "L2", MON_0900, "R102"),
            ],
        })
        .await
        .expect("corrective import should succeed");
    let conflict_id = report.conflicts[0].id;

    let resolved = facade
        .resolve_conflict(conflict_id, ConflictOutcome::Resolved, Some("operator".to_string()))
        .await
        .expect("detected conflict should resolve");
    assert_eq!(resolved.status, ConflictStatus::Resolved);

    let err = facade
        .resolve_conflict(conflict_id, ConflictOutcome::Ignored, None)
        .await
        .expect_err("terminal conflict cannot move again");
    assert_eq!(err.kind, ScheduleErrorKind::InvalidTransition);
}
