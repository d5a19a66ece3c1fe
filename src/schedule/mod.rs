#![allow(dead_code)]

pub mod audit;
pub mod coordinator;
pub mod detector;
pub mod error;
pub mod facade;
pub mod lifecycle;
pub mod locks;
pub mod memory;
pub mod persistence;
pub mod ports;
pub mod timeslots;
pub mod types;

pub use audit::{
    AuditEvent, AuditOperation, AuditOutcome, AuditSink, NoopAuditSink, TracingAuditSink,
};
pub use coordinator::ConsistencyCoordinator;
pub use detector::{ConflictDetector, assert_schedule_invariants, colliding_kinds};
pub use error::{ScheduleError, ScheduleErrorKind, StoreError};
pub use facade::{ScheduleFacade, ScheduleStores};
pub use lifecycle::ConflictLifecycleManager;
pub use locks::{KeyedLocks, LockKey, LockScope};
pub use memory::{InMemoryAssignmentStore, InMemoryConflictStore, InMemoryTimeSlotCatalog};
pub use persistence::{ScheduleSnapshot, SnapshotPersistence};
pub use ports::{AssignmentStore, ConflictStore, ResourceQuery, TimeSlotCatalog};
pub use timeslots::TimeSlotRegistry;
pub use types::{
    Assignment, AssignmentDraft, AssignmentFilter, AssignmentId, AssignmentKind, AssignmentPatch,
    AssignmentStatus, Conflict, ConflictId, ConflictKind, ConflictOutcome, ConflictSeverity,
    ConflictStatus, DayOfWeek, ImportBatch, ImportRejection, ImportReport, ResourceKind, TimeSlot,
    TimeSlotDraft, TimeSlotId, UserId,
};
