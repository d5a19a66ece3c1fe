use std::sync::{Arc, Mutex};

use slotguard::{
    config::EngineConfig,
    schedule::{AssignmentDraft, AuditEvent, AuditSink, ScheduleFacade},
};

pub const MON_0900: &str = "mon-0900";
pub const TUE_0900: &str = "tue-0900";

#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }
}

impl AuditSink for RecordingAuditSink {
    fn on_event(&self, event: AuditEvent) {
        self.events.lock().expect("lock poisoned").push(event);
    }
}

pub fn facade() -> ScheduleFacade {
    facade_with_audit().0
}

pub fn facade_with_audit() -> (ScheduleFacade, Arc<RecordingAuditSink>) {
    let audit = Arc::new(RecordingAuditSink::default());
    let facade = ScheduleFacade::in_memory(&EngineConfig::default(), audit.clone());
    (facade, audit)
}

pub fn draft(
    class: &str,
    teacher: &str,
    subject: &str,
    lesson: &str,
    slot: &str,
    room: &str,
) -> AssignmentDraft {
    AssignmentDraft::new(class, teacher, subject, lesson, slot, room, "planner")
}
