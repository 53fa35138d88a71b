//! services/timetable/src/tasks.rs
//!
//! Application service that keeps stored tasks and their reminders consistent.
//! Every write that changes a task's due date or completion also schedules or
//! cancels the matching reminder through the `NotificationService` port.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::HashMap;
use std::sync::Arc;
use timetable_core::domain::{
    NewTask, ReminderHandle, Slot, Subject, SubjectId, SubjectInput, Task, TaskId,
    TaskWithSubject, TimetableImport,
};
use timetable_core::ports::{NotificationService, PersistenceService, PortError, PortResult};
use tracing::{info, warn};

const REMINDER_TITLE: &str = "Task due today!";

#[derive(Clone)]
pub struct TaskPlanner {
    db: Arc<dyn PersistenceService>,
    notifier: Arc<dyn NotificationService>,
    reminder_hour: u32,
}

impl TaskPlanner {
    pub fn new(
        db: Arc<dyn PersistenceService>,
        notifier: Arc<dyn NotificationService>,
        reminder_hour: u32,
    ) -> Self {
        Self {
            db,
            notifier,
            reminder_hour,
        }
    }

    /// Local time at which the reminder for a task due on `due_date` fires.
    pub fn reminder_time(&self, due_date: NaiveDate) -> NaiveDateTime {
        let time = NaiveTime::from_hms_opt(self.reminder_hour, 0, 0).unwrap_or(NaiveTime::MIN);
        due_date.and_time(time)
    }

    async fn schedule(&self, content: &str, due_date: NaiveDate) -> PortResult<Option<ReminderHandle>> {
        self.notifier
            .schedule_reminder(REMINDER_TITLE, content, self.reminder_time(due_date))
            .await
    }

    async fn cancel(&self, reminder: Option<&ReminderHandle>) -> PortResult<()> {
        match reminder {
            Some(handle) => self.notifier.cancel_reminder(handle).await,
            None => Ok(()),
        }
    }

    /// Passes `result` through. On failure the reminder scheduled for the
    /// write is cancelled so it cannot fire for a task that was never stored.
    async fn keep_or_cancel<T>(
        &self,
        reminder: Option<&ReminderHandle>,
        result: PortResult<T>,
    ) -> PortResult<T> {
        if let (Err(_), Some(handle)) = (&result, reminder) {
            if let Err(e) = self.notifier.cancel_reminder(handle).await {
                warn!(%handle, "Failed to cancel reminder of a failed write: {}", e);
            }
        }
        result
    }

    // --- Subjects ---

    /// Stores a new subject together with its one weekly slot.
    pub async fn add_subject(&self, subject: SubjectInput, slot: Slot) -> PortResult<SubjectId> {
        let subject = clean_subject(subject)?;
        check_slot(slot)?;

        let id = self.db.add_subject(&subject).await?;
        self.db.add_class(id, slot).await?;
        info!(subject_id = id, name = %subject.name, "Subject added.");
        Ok(id)
    }

    /// Updates a subject and moves its classes to `slot`.
    pub async fn update_subject(&self, subject: Subject, slot: Slot) -> PortResult<()> {
        let cleaned = clean_subject(SubjectInput::from(&subject))?;
        check_slot(slot)?;

        let subject = Subject {
            id: subject.id,
            name: cleaned.name,
            teacher: cleaned.teacher,
            room: cleaned.room,
            color: cleaned.color,
        };
        self.db.update_subject(&subject).await?;
        self.db.update_class_slot(subject.id, slot).await
    }

    /// Cancels every pending reminder of the subject's tasks, then deletes it.
    pub async fn delete_subject(&self, subject_id: SubjectId) -> PortResult<()> {
        for handle in self.db.reminder_handles_for_subject(subject_id).await? {
            self.notifier.cancel_reminder(&handle).await?;
        }
        self.db.delete_subject(subject_id).await?;
        info!(subject_id, "Subject deleted.");
        Ok(())
    }

    // --- Tasks ---

    pub async fn add_task(&self, task: NewTask) -> PortResult<TaskId> {
        let content = task.content.trim();
        if content.is_empty() {
            return Err(PortError::InvalidInput("task content is empty".to_string()));
        }
        let task = NewTask {
            content: content.to_string(),
            ..task
        };

        let reminder = self.schedule(&task.content, task.due_date).await?;
        let stored = self.db.add_task(&task, reminder.as_ref()).await;
        let id = self.keep_or_cancel(reminder.as_ref(), stored).await?;
        info!(task_id = id, due = %task.due_date, reminder = reminder.is_some(), "Task added.");
        Ok(id)
    }

    /// Marks a task done (cancelling its reminder) or open again (scheduling a new one).
    pub async fn set_done(&self, task_id: TaskId, done: bool) -> PortResult<()> {
        let task = self.db.get_task(task_id).await?;

        if done {
            self.cancel(task.reminder.as_ref()).await?;
            self.db.set_task_status(task_id, true, None).await
        } else {
            self.cancel(task.reminder.as_ref()).await?;
            let reminder = self.schedule(&task.content, task.due_date).await?;
            let stored = self
                .db
                .set_task_status(task_id, false, reminder.as_ref())
                .await;
            self.keep_or_cancel(reminder.as_ref(), stored).await
        }
    }

    /// Changes a task's text and due date; the reminder follows the new date.
    pub async fn edit_task(
        &self,
        task_id: TaskId,
        content: &str,
        due_date: NaiveDate,
    ) -> PortResult<()> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PortError::InvalidInput("task content is empty".to_string()));
        }
        let task = self.db.get_task(task_id).await?;

        self.cancel(task.reminder.as_ref()).await?;
        let reminder = if task.is_done {
            None
        } else {
            self.schedule(content, due_date).await?
        };
        let stored = self
            .db
            .update_task(task_id, content, due_date, reminder.as_ref())
            .await;
        self.keep_or_cancel(reminder.as_ref(), stored).await
    }

    pub async fn delete_task(&self, task_id: TaskId) -> PortResult<()> {
        let task = self.db.get_task(task_id).await?;
        self.cancel(task.reminder.as_ref()).await?;
        self.db.delete_task(task_id).await
    }

    /// Schedules reminders again for every open task.
    ///
    /// Returns how many reminders are pending afterwards.
    pub async fn rearm_reminders(&self) -> PortResult<usize> {
        let mut armed = 0;
        for entry in self.db.all_tasks().await? {
            let task = entry.task;
            if task.is_done {
                continue;
            }
            self.cancel(task.reminder.as_ref()).await?;
            let reminder = self.schedule(&task.content, task.due_date).await?;
            if reminder.is_some() {
                armed += 1;
            }
            let stored = self.db.set_task_reminder(task.id, reminder.as_ref()).await;
            self.keep_or_cancel(reminder.as_ref(), stored).await?;
        }
        info!(armed, "Task reminders re-armed.");
        Ok(armed)
    }

    /// Called once a reminder has been delivered; its task no longer has one pending.
    pub async fn reminder_delivered(&self, reminder: &ReminderHandle) -> PortResult<()> {
        self.db.clear_reminder(reminder).await
    }

    /// Replaces the stored timetable and drops the reminders of the tasks it wipes.
    pub async fn replace_timetable(&self, data: &TimetableImport) -> PortResult<()> {
        let stale: Vec<ReminderHandle> = self
            .db
            .all_tasks()
            .await?
            .into_iter()
            .filter_map(|entry| entry.task.reminder)
            .collect();

        self.db.import_all(data).await?;

        for handle in &stale {
            if let Err(e) = self.notifier.cancel_reminder(handle).await {
                warn!(%handle, "Failed to cancel reminder of replaced task: {}", e);
            }
        }
        Ok(())
    }

    // --- Queries ---

    pub async fn tasks_for_subject(&self, subject_id: SubjectId) -> PortResult<Vec<Task>> {
        self.db.tasks_for_subject(subject_id).await
    }

    pub async fn all_tasks(&self) -> PortResult<Vec<TaskWithSubject>> {
        self.db.all_tasks().await
    }

    pub async fn incomplete_task_count(&self) -> PortResult<u64> {
        self.db.incomplete_task_count().await
    }

    pub async fn incomplete_counts_by_subject(&self) -> PortResult<HashMap<SubjectId, u64>> {
        self.db.incomplete_counts_by_subject().await
    }
}

fn trimmed(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn clean_subject(subject: SubjectInput) -> PortResult<SubjectInput> {
    let name = subject.name.trim().to_string();
    if name.is_empty() {
        return Err(PortError::InvalidInput("subject name is empty".to_string()));
    }
    Ok(SubjectInput {
        name,
        teacher: trimmed(subject.teacher),
        room: trimmed(subject.room),
        color: subject.color.trim().to_string(),
    })
}

fn check_slot(slot: Slot) -> PortResult<()> {
    if !slot.is_valid() {
        return Err(PortError::InvalidInput(format!(
            "day {} / period {} is not a valid slot",
            slot.day_of_week, slot.period
        )));
    }
    Ok(())
}
