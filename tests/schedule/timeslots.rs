use slotguard::schedule::{DayOfWeek, ScheduleErrorKind, TimeSlotDraft};
use time::macros::time;

use crate::support::facade;

#[tokio::test]
async fn given_defined_slots_when_listed_then_ordered_by_day_then_start() {
    let facade = facade();
    for (day, start, end) in [
        (DayOfWeek::Wednesday, time!(08:00), time!(09:00)),
        (DayOfWeek::Monday, time!(13:00), time!(14:00)),
        (DayOfWeek::Monday, time!(08:00), time!(09:00)),
    ] {
        facade
            .define_time_slot(TimeSlotDraft {
                id: None,
                day,
                start,
                end,
                label: None,
            })
            .await
            .expect("slot should be defined");
    }

    let slots = facade.list_time_slots().await.expect("listing should succeed");
    let order: Vec<(DayOfWeek, time::Time)> =
        slots.iter().map(|slot| (slot.day, slot.start)).collect();
    assert_eq!(
        order,
        vec![
            (DayOfWeek::Monday, time!(08:00)),
            (DayOfWeek::Monday, time!(13:00)),
            (DayOfWeek::Wednesday, time!(08:00)),
        ]
    );
    assert!(slots.iter().all(|slot| !slot.id.is_empty()), "ids are generated");

    let wednesday = facade
        .list_time_slots_by_day(DayOfWeek::Wednesday)
        .await
        .expect("listing should succeed");
    assert_eq!(wednesday.len(), 1);

    let fetched = facade
        .get_time_slot(&wednesday[0].id)
        .await
        .expect("slot should be fetched by id");
    assert_eq!(fetched, wednesday[0]);
}

#[tokio::test]
async fn given_existing_slot_when_duplicate_id_or_overlap_defined_then_validation_error() {
    let facade = facade();
    facade
        .define_time_slot(TimeSlotDraft {
            id: Some("fri-1000".to_string()),
            day: DayOfWeek::Friday,
            start: time!(10:00),
            end: time!(11:00),
            label: None,
        })
        .await
        .expect("slot should be defined");

    let duplicate = facade
        .define_time_slot(TimeSlotDraft {
            id: Some("fri-1000".to_string()),
            day: DayOfWeek::Saturday,
            start: time!(10:00),
            end: time!(11:00),
            label: None,
        })
        .await
        .expect_err("ids are unique");
    assert_eq!(duplicate.kind, ScheduleErrorKind::Validation);

    let overlap = facade
        .define_time_slot(TimeSlotDraft {
            id: None,
            day: DayOfWeek::Friday,
            start: time!(10:59),
            end: time!(12:00),
            label: None,
        })
        .await
        .expect_err("overlapping interval");
    assert_eq!(overlap.kind, ScheduleErrorKind::Validation);

    facade
        .define_time_slot(TimeSlotDraft {
            id: None,
            day: DayOfWeek::Friday,
            start: time!(11:00),
            end: time!(12:00),
            label: None,
        })
        .await
        .expect("adjacent interval is allowed");

    let err = facade
        .get_time_slot("unknown")
        .await
        .expect_err("unknown slot");
    assert_eq!(err.kind, ScheduleErrorKind::NotFound);
}
