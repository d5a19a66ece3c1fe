use std::fmt;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, Time};
use uuid::Uuid;
use validator::Validate;

use crate::schedule::error::ScheduleErrorKind;

pub type AssignmentId = Uuid;
pub type ConflictId = Uuid;
pub type TimeSlotId = String;
pub type ClassId = String;
pub type TeacherId = String;
pub type ClassroomId = String;
pub type SubjectId = String;
pub type LessonId = String;
pub type UserId = String;

time::serde::format_description!(clock_time, Time, "[hour]:[minute]");

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentKind {
    #[default]
    Regular,
    Additional,
    Remedial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Inactive,
    Cancelled,
}

impl AssignmentStatus {
    /// Only active assignments take part in double-booking checks.
    pub fn participates(self) -> bool {
        matches!(self, Self::Active)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub class_id: ClassId,
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub lesson_id: LessonId,
    pub time_slot_id: TimeSlotId,
    pub classroom_id: ClassroomId,
    pub kind: AssignmentKind,
    pub status: AssignmentStatus,
    pub created_by: UserId,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Assignment {
    pub fn resource_id(&self, kind: ResourceKind) -> &str {
        match kind {
            ResourceKind::Teacher => &self.teacher_id,
            ResourceKind::Classroom => &self.classroom_id,
            ResourceKind::Class => &self.class_id,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.participates()
    }
}

/// Candidate assignment as submitted by a caller. Every reference is optional
/// on the wire so that missing fields surface as validation errors rather
/// than deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct AssignmentDraft {
    #[serde(default)]
    #[validate(required(message = "class_id is required"), length(min = 1))]
    pub class_id: Option<ClassId>,
    #[serde(default)]
    #[validate(required(message = "teacher_id is required"), length(min = 1))]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    #[validate(required(message = "subject_id is required"), length(min = 1))]
    pub subject_id: Option<SubjectId>,
    #[serde(default)]
    #[validate(required(message = "lesson_id is required"), length(min = 1))]
    pub lesson_id: Option<LessonId>,
    #[serde(default)]
    #[validate(required(message = "time_slot_id is required"), length(min = 1))]
    pub time_slot_id: Option<TimeSlotId>,
    #[serde(default)]
    #[validate(required(message = "classroom_id is required"), length(min = 1))]
    pub classroom_id: Option<ClassroomId>,
    #[serde(default)]
    #[validate(required(message = "created_by is required"), length(min = 1))]
    pub created_by: Option<UserId>,
    #[serde(default)]
    pub kind: Option<AssignmentKind>,
}

impl AssignmentDraft {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        class_id: impl Into<ClassId>,
        teacher_id: impl Into<TeacherId>,
        subject_id: impl Into<SubjectId>,
        lesson_id: impl Into<LessonId>,
        time_slot_id: impl Into<TimeSlotId>,
        classroom_id: impl Into<ClassroomId>,
        created_by: impl Into<UserId>,
    ) -> Self {
        Self {
            class_id: Some(class_id.into()),
            teacher_id: Some(teacher_id.into()),
            subject_id: Some(subject_id.into()),
            lesson_id: Some(lesson_id.into()),
            time_slot_id: Some(time_slot_id.into()),
            classroom_id: Some(classroom_id.into()),
            created_by: Some(created_by.into()),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: AssignmentKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Enumerated set of fields an update may touch. Identity, creator and
/// timestamps are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentPatch {
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
    #[serde(default)]
    pub lesson_id: Option<LessonId>,
    #[serde(default)]
    pub time_slot_id: Option<TimeSlotId>,
    #[serde(default)]
    pub classroom_id: Option<ClassroomId>,
    #[serde(default)]
    pub kind: Option<AssignmentKind>,
    #[serde(default)]
    pub status: Option<AssignmentStatus>,
}

impl AssignmentPatch {
    pub fn is_empty(&self) -> bool {
        self.teacher_id.is_none()
            && self.subject_id.is_none()
            && self.lesson_id.is_none()
            && self.time_slot_id.is_none()
            && self.classroom_id.is_none()
            && self.kind.is_none()
            && self.status.is_none()
    }

    pub fn time_slot(time_slot_id: impl Into<TimeSlotId>) -> Self {
        Self {
            time_slot_id: Some(time_slot_id.into()),
            ..Self::default()
        }
    }

    pub fn classroom(classroom_id: impl Into<ClassroomId>) -> Self {
        Self {
            classroom_id: Some(classroom_id.into()),
            ..Self::default()
        }
    }

    /// Produces the post-patch view of `current` without touching timestamps.
    pub fn apply_to(&self, current: &Assignment) -> Assignment {
        let mut next = current.clone();
        if let Some(teacher_id) = &self.teacher_id {
            next.teacher_id = teacher_id.clone();
        }
        if let Some(subject_id) = &self.subject_id {
            next.subject_id = subject_id.clone();
        }
        if let Some(lesson_id) = &self.lesson_id {
            next.lesson_id = lesson_id.clone();
        }
        if let Some(time_slot_id) = &self.time_slot_id {
            next.time_slot_id = time_slot_id.clone();
        }
        if let Some(classroom_id) = &self.classroom_id {
            next.classroom_id = classroom_id.clone();
        }
        if let Some(kind) = self.kind {
            next.kind = kind;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        next
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Teacher,
    Classroom,
    Class,
}

impl ResourceKind {
    pub const CHECK_ORDER: [ResourceKind; 3] = [Self::Teacher, Self::Classroom, Self::Class];

    pub fn conflict_kind(self) -> ConflictKind {
        match self {
            Self::Teacher => ConflictKind::TeacherDouble,
            Self::Classroom => ConflictKind::ClassroomDouble,
            Self::Class => ConflictKind::ClassDouble,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Teacher => "teacher",
            Self::Classroom => "classroom",
            Self::Class => "class",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConflictKind {
    TeacherDouble,
    ClassroomDouble,
    ClassDouble,
}

impl ConflictKind {
    pub fn resource(self) -> ResourceKind {
        match self {
            Self::TeacherDouble => ResourceKind::Teacher,
            Self::ClassroomDouble => ResourceKind::Classroom,
            Self::ClassDouble => ResourceKind::Class,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::TeacherDouble => "Teacher is assigned to multiple classes at the same time",
            Self::ClassroomDouble => "Classroom is assigned to multiple classes at the same time",
            Self::ClassDouble => "Class is assigned multiple subjects at the same time",
        }
    }

    pub fn rejection_message(self) -> &'static str {
        match self {
            Self::TeacherDouble => "Teacher is already assigned to another class at this time",
            Self::ClassroomDouble => "Classroom is already assigned to another class at this time",
            Self::ClassDouble => "Class is already assigned another subject at this time",
        }
    }

    pub fn suggested_resolution(self) -> &'static str {
        match self {
            Self::TeacherDouble => "Choose a different time slot or teacher",
            Self::ClassroomDouble => "Choose a different classroom or time slot",
            Self::ClassDouble => "Choose a different time slot",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TeacherDouble => "TeacherDouble",
            Self::ClassroomDouble => "ClassroomDouble",
            Self::ClassDouble => "ClassDouble",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSeverity {
    High,
    Medium,
    Low,
}

impl ConflictSeverity {
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStatus {
    Detected,
    Resolved,
    Ignored,
}

impl ConflictStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Ignored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictOutcome {
    Resolved,
    Ignored,
}

impl From<ConflictOutcome> for ConflictStatus {
    fn from(outcome: ConflictOutcome) -> Self {
        match outcome {
            ConflictOutcome::Resolved => Self::Resolved,
            ConflictOutcome::Ignored => Self::Ignored,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub assignment_id: AssignmentId,
    pub kind: ConflictKind,
    pub description: String,
    pub severity: ConflictSeverity,
    pub status: ConflictStatus,
    #[serde(default)]
    pub suggested_resolution: Option<String>,
    #[serde(default)]
    pub resolved_by: Option<UserId>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub resolved_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Conflict {
    pub fn detected(
        assignment_id: AssignmentId,
        kind: ConflictKind,
        severity: ConflictSeverity,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            assignment_id,
            kind,
            description: kind.description().to_string(),
            severity,
            status: ConflictStatus::Detected,
            suggested_resolution: Some(kind.suggested_resolution().to_string()),
            resolved_by: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub day: DayOfWeek,
    #[serde(with = "clock_time")]
    pub start: Time,
    #[serde(with = "clock_time")]
    pub end: Time,
    #[serde(default)]
    pub label: Option<String>,
}

impl TimeSlot {
    /// Half-open interval overlap on the same day.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.day == other.day && self.start < other.end && self.end > other.start
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlotDraft {
    #[serde(default)]
    pub id: Option<TimeSlotId>,
    pub day: DayOfWeek,
    #[serde(with = "clock_time")]
    pub start: Time,
    #[serde(with = "clock_time")]
    pub end: Time,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentFilter {
    All,
    Class(ClassId),
    Teacher(TeacherId),
    TimeSlot(TimeSlotId),
    Classroom(ClassroomId),
    Status(AssignmentStatus),
}

impl AssignmentFilter {
    /// Resource-keyed listings only ever surface active assignments.
    pub fn matches(&self, assignment: &Assignment) -> bool {
        match self {
            Self::All => true,
            Self::Class(class_id) => assignment.is_active() && &assignment.class_id == class_id,
            Self::Teacher(teacher_id) => {
                assignment.is_active() && &assignment.teacher_id == teacher_id
            }
            Self::TimeSlot(time_slot_id) => {
                assignment.is_active() && &assignment.time_slot_id == time_slot_id
            }
            Self::Classroom(classroom_id) => {
                assignment.is_active() && &assignment.classroom_id == classroom_id
            }
            Self::Status(status) => assignment.status == *status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBatch {
    #[serde(default)]
    pub time_slots: Vec<TimeSlotDraft>,
    #[serde(default)]
    pub assignments: Vec<AssignmentDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRejection {
    /// Location inside the batch, e.g. `assignments[3]`.
    pub entry: String,
    pub kind: ScheduleErrorKind,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportReport {
    pub time_slots: Vec<TimeSlot>,
    pub assignments: Vec<Assignment>,
    pub conflicts: Vec<Conflict>,
    pub rejected: Vec<ImportRejection>,
}
