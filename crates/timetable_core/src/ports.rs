//! crates/timetable_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete storage engine and reminder mechanism.

use crate::domain::{
    ClassId, ClassSession, NewTask, ReminderHandle, Slot, Subject, SubjectId, SubjectInput, Task,
    TaskId, TaskWithSubject, TimetableExport, TimetableImport,
};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, scheduler).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait PersistenceService: Send + Sync {
    // --- Whole-timetable transfer ---

    /// Returns every subject and class session, subjects in insertion order.
    async fn export_all(&self) -> PortResult<TimetableExport>;

    /// Replaces all subjects, classes and tasks with `data`.
    ///
    /// Must be atomic: on failure the previously stored timetable is left untouched.
    async fn import_all(&self, data: &TimetableImport) -> PortResult<()>;

    // --- Subjects and their slots ---
    async fn add_subject(&self, subject: &SubjectInput) -> PortResult<SubjectId>;

    async fn update_subject(&self, subject: &Subject) -> PortResult<()>;

    /// Deletes a subject; its classes and tasks go with it.
    async fn delete_subject(&self, subject_id: SubjectId) -> PortResult<()>;

    async fn get_subject(&self, subject_id: SubjectId) -> PortResult<(Subject, Vec<ClassSession>)>;

    async fn add_class(&self, subject_id: SubjectId, slot: Slot) -> PortResult<ClassId>;

    /// Moves every class of the subject to `slot`.
    async fn update_class_slot(&self, subject_id: SubjectId, slot: Slot) -> PortResult<()>;

    // --- Tasks ---
    async fn add_task(&self, task: &NewTask, reminder: Option<&ReminderHandle>) -> PortResult<TaskId>;

    async fn get_task(&self, task_id: TaskId) -> PortResult<Task>;

    async fn update_task(
        &self,
        task_id: TaskId,
        content: &str,
        due_date: NaiveDate,
        reminder: Option<&ReminderHandle>,
    ) -> PortResult<()>;

    async fn set_task_status(
        &self,
        task_id: TaskId,
        is_done: bool,
        reminder: Option<&ReminderHandle>,
    ) -> PortResult<()>;

    async fn set_task_reminder(
        &self,
        task_id: TaskId,
        reminder: Option<&ReminderHandle>,
    ) -> PortResult<()>;

    /// Forgets a reminder that has fired. A handle no task holds is not an error.
    async fn clear_reminder(&self, reminder: &ReminderHandle) -> PortResult<()>;

    async fn delete_task(&self, task_id: TaskId) -> PortResult<()>;

    /// Tasks of one subject, earliest due date first.
    async fn tasks_for_subject(&self, subject_id: SubjectId) -> PortResult<Vec<Task>>;

    /// All tasks with their subject, open tasks first, then by due date.
    async fn all_tasks(&self) -> PortResult<Vec<TaskWithSubject>>;

    async fn incomplete_task_count(&self) -> PortResult<u64>;

    async fn incomplete_counts_by_subject(&self) -> PortResult<HashMap<SubjectId, u64>>;

    async fn reminder_handles_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> PortResult<Vec<ReminderHandle>>;
}

#[async_trait]
pub trait NotificationService: Send + Sync {
    /// Schedules a reminder for local time `at`.
    ///
    /// Returns `None` when `at` is already in the past and nothing was scheduled.
    async fn schedule_reminder(
        &self,
        title: &str,
        body: &str,
        at: NaiveDateTime,
    ) -> PortResult<Option<ReminderHandle>>;

    /// Cancels a pending reminder. Unknown or already-fired handles are not an error.
    async fn cancel_reminder(&self, handle: &ReminderHandle) -> PortResult<()>;
}
