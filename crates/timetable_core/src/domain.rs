//! crates/timetable_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::NaiveDate;
use std::fmt;

pub type SubjectId = i64;
pub type ClassId = i64;
pub type TaskId = i64;

/// Number of days in the weekly cycle. `day_of_week` is 0-based, Monday first.
pub const DAYS_PER_WEEK: u8 = 7;

/// A course the user attends, as stored on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub teacher: Option<String>,
    pub room: Option<String>,
    /// A color specifier such as `#ffc107`.
    pub color: String,
}

/// One weekly recurring slot of a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassSession {
    pub id: ClassId,
    pub subject_id: SubjectId,
    pub day_of_week: u8,
    pub period: u32,
}

/// Where a class sits in the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    pub day_of_week: u8,
    pub period: u32,
}

impl Slot {
    pub fn is_valid(&self) -> bool {
        self.day_of_week < DAYS_PER_WEEK && self.period >= 1
    }
}

/// Opaque identifier returned by the notification service for a pending reminder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReminderHandle(pub String);

impl fmt::Display for ReminderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A due-dated piece of work attached to a subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub subject_id: SubjectId,
    pub content: String,
    pub due_date: NaiveDate,
    pub is_done: bool,
    /// Present only while a reminder is pending.
    pub reminder: Option<ReminderHandle>,
}

/// A task joined with the subject it belongs to, for list views.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskWithSubject {
    pub task: Task,
    pub subject_name: String,
    pub subject_color: String,
}

/// The fields needed to create a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub subject_id: SubjectId,
    pub content: String,
    pub due_date: NaiveDate,
}

//=========================================================================================
// Identity-less forms used when moving a timetable between devices
//=========================================================================================

/// A subject without a persisted identifier. Its position in the surrounding
/// sequence is its identity until it is inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectInput {
    pub name: String,
    pub teacher: Option<String>,
    pub room: Option<String>,
    pub color: String,
}

impl From<&Subject> for SubjectInput {
    fn from(subject: &Subject) -> Self {
        Self {
            name: subject.name.clone(),
            teacher: subject.teacher.clone(),
            room: subject.room.clone(),
            color: subject.color.clone(),
        }
    }
}

/// A class slot referring to a subject by its zero-based index in the
/// accompanying `SubjectInput` sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassInput {
    pub subject_index: usize,
    pub day_of_week: u8,
    pub period: u32,
}

/// Everything `export_all` returns: the stored timetable, with identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimetableExport {
    pub subjects: Vec<Subject>,
    pub classes: Vec<ClassSession>,
}

impl TimetableExport {
    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.id == id)
    }
}

/// A timetable ready to replace the stored one. Identifiers are assigned on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimetableImport {
    pub subjects: Vec<SubjectInput>,
    pub classes: Vec<ClassInput>,
}
