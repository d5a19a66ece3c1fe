use std::sync::Arc;

use slotguard::{
    config::EngineConfig,
    schedule::{
        AssignmentStatus, AuditOperation, AuditOutcome, ConflictKind, ImportBatch, NoopAuditSink,
        ScheduleErrorKind, ScheduleFacade, SnapshotPersistence,
    },
};
use uuid::Uuid;

use crate::support::{MON_0900, draft, facade, facade_with_audit};

const BATCH: &str = r#"{
  // slots first, then assignments
  time_slots: [
    { id: "mon-0900", day: "monday", start: "09:00", end: "10:00", label: "Period 1" },
    { id: "mon-0930", day: "monday", start: "09:30", end: "10:30" },
  ],
  assignments: [
    { class_id: "C1", teacher_id: "T1", subject_id: "S1", lesson_id: "L1",
      time_slot_id: "mon-0900", classroom_id: "R101", created_by: "importer" },
    { class_id: "C2", teacher_id: "T1", subject_id: "S2", lesson_id: "L2",
      time_slot_id: "mon-0900", classroom_id: "R102", created_by: "importer", kind: "remedial" },
    { class_id: "C3", subject_id: "S3", lesson_id: "L3",
      time_slot_id: "mon-0900", classroom_id: "R103", created_by: "importer" },
  ],
}"#;

#[tokio::test]
async fn given_json5_batch_when_imported_then_double_bookings_are_kept_and_recorded() {
    let (facade, audit) = facade_with_audit();
    let batch: ImportBatch = json5::from_str(BATCH).expect("batch should parse");

    let report = facade
        .import_assignments(batch)
        .await
        .expect("import should succeed");

    assert_eq!(report.time_slots.len(), 1);
    assert_eq!(report.time_slots[0].label.as_deref(), Some("Period 1"));
    assert_eq!(report.assignments.len(), 2);
    assert!(
        report
            .assignments
            .iter()
            .all(|assignment| assignment.status == AssignmentStatus::Active)
    );
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].kind, ConflictKind::TeacherDouble);
    assert_eq!(report.conflicts[0].assignment_id, report.assignments[1].id);

    let rejected: Vec<(&str, ScheduleErrorKind)> = report
        .rejected
        .iter()
        .map(|rejection| (rejection.entry.as_str(), rejection.kind))
        .collect();
    assert_eq!(
        rejected,
        vec![
            ("time_slots[1]", ScheduleErrorKind::Validation),
            ("assignments[2]", ScheduleErrorKind::Validation),
        ]
    );
    assert!(report.rejected[1].reason.contains("teacher_id"));

    let import_event = audit
        .events()
        .into_iter()
        .find(|event| event.operation == AuditOperation::Import)
        .expect("import should be audited");
    assert_eq!(import_event.outcome, AuditOutcome::Succeeded);
    assert_eq!(import_event.conflict_kinds, vec![ConflictKind::TeacherDouble]);
}

#[tokio::test]
async fn given_imported_conflicts_when_strict_create_follows_then_it_is_still_rejected() {
    let facade = facade();
    facade
        .import_assignments(ImportBatch {
            time_slots: Vec::new(),
            assignments: vec![draft("C1", "T1", "S1", "L1", MON_0900, "R101")],
        })
        .await
        .expect("import should succeed");

    let err = facade
        .create_assignment(draft("C9", "T9", "S9", "L9", MON_0900, "R101"))
        .await
        .expect_err("imported rows take part in strict checks");
    assert_eq!(err.conflict_kind(), Some(ConflictKind::ClassroomDouble));
}

#[tokio::test]
async fn given_saved_snapshot_when_reloaded_then_assignments_and_conflicts_survive() {
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
        .expect("import should succeed");

    let path = std::env::temp_dir()
        .join(format!("slotguard-import-test-{}", Uuid::now_v7()))
        .join("schedule.json");
    let persistence = SnapshotPersistence::new(path.clone());
    persistence
        .save(&facade.snapshot().await.expect("snapshot should be read"))
        .expect("snapshot should save");

    let snapshot = persistence
        .load()
        .expect("snapshot should load")
        .expect("snapshot should exist");
    let reloaded =
        ScheduleFacade::from_snapshot(snapshot, &EngineConfig::default(), Arc::new(NoopAuditSink));

    let doubled = reloaded
        .get_assignment(&report.assignments[1].id)
        .await
        .expect("assignment should survive reload");
    assert_eq!(doubled.class_id, "C2");
    assert_eq!(
        reloaded
            .count_unresolved_conflicts()
            .await
            .expect("count should succeed"),
        1
    );
    let err = reloaded
        .create_assignment(draft("C3", "T1", "S3", "L3", MON_0900, "R103"))
        .await
        .expect_err("reloaded rows still hold the teacher");
    assert_eq!(err.conflict_kind(), Some(ConflictKind::TeacherDouble));

    let _ = std::fs::remove_dir_all(path.parent().expect("temp path has parent"));
}
