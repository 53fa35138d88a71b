//! services/timetable/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `PersistenceService` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use timetable_core::domain::{
    ClassId, ClassSession, NewTask, ReminderHandle, Slot, Subject, SubjectId, SubjectInput, Task,
    TaskId, TaskWithSubject, TimetableExport, TimetableImport,
};
use timetable_core::ports::{PersistenceService, PortError, PortResult};
use tracing::info;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `PersistenceService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for `database_url`.
    ///
    /// An in-memory database exists per connection, so it is limited to one.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn not_found(what: &str, id: i64) -> impl FnOnce(sqlx::Error) -> PortError + '_ {
    move |e| match e {
        sqlx::Error::RowNotFound => PortError::NotFound(format!("{} {} not found", what, id)),
        _ => unexpected(e),
    }
}

fn ensure_affected(rows: u64, what: &str, id: i64) -> PortResult<()> {
    if rows == 0 {
        return Err(PortError::NotFound(format!("{} {} not found", what, id)));
    }
    Ok(())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SubjectRecord {
    id: i64,
    name: String,
    teacher: Option<String>,
    room: Option<String>,
    color: String,
}
impl SubjectRecord {
    fn to_domain(self) -> Subject {
        Subject {
            id: self.id,
            name: self.name,
            teacher: self.teacher,
            room: self.room,
            color: self.color,
        }
    }
}

#[derive(FromRow)]
struct ClassRecord {
    id: i64,
    subject_id: i64,
    day_of_week: i64,
    period: i64,
}
impl ClassRecord {
    fn to_domain(self) -> ClassSession {
        ClassSession {
            id: self.id,
            subject_id: self.subject_id,
            day_of_week: self.day_of_week as u8,
            period: self.period as u32,
        }
    }
}

#[derive(FromRow)]
struct TaskRecord {
    id: i64,
    subject_id: i64,
    content: String,
    due_date: NaiveDate,
    is_done: bool,
    reminder_id: Option<String>,
}
impl TaskRecord {
    fn to_domain(self) -> Task {
        Task {
            id: self.id,
            subject_id: self.subject_id,
            content: self.content,
            due_date: self.due_date,
            is_done: self.is_done,
            reminder: self.reminder_id.map(ReminderHandle),
        }
    }
}

#[derive(FromRow)]
struct TaskWithSubjectRecord {
    id: i64,
    subject_id: i64,
    content: String,
    due_date: NaiveDate,
    is_done: bool,
    reminder_id: Option<String>,
    subject_name: String,
    subject_color: String,
}
impl TaskWithSubjectRecord {
    fn to_domain(self) -> TaskWithSubject {
        TaskWithSubject {
            task: Task {
                id: self.id,
                subject_id: self.subject_id,
                content: self.content,
                due_date: self.due_date,
                is_done: self.is_done,
                reminder: self.reminder_id.map(ReminderHandle),
            },
            subject_name: self.subject_name,
            subject_color: self.subject_color,
        }
    }
}

#[derive(FromRow)]
struct CountRecord {
    subject_id: i64,
    count: i64,
}

//=========================================================================================
// `PersistenceService` Trait Implementation
//=========================================================================================

#[async_trait]
impl PersistenceService for DbAdapter {
    async fn export_all(&self) -> PortResult<TimetableExport> {
        let subjects = sqlx::query_as::<_, SubjectRecord>(
            "SELECT id, name, teacher, room, color FROM subjects ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        let classes = sqlx::query_as::<_, ClassRecord>(
            "SELECT id, subject_id, day_of_week, period FROM classes ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(TimetableExport {
            subjects: subjects.into_iter().map(|r| r.to_domain()).collect(),
            classes: classes.into_iter().map(|r| r.to_domain()).collect(),
        })
    }

    async fn import_all(&self, data: &TimetableImport) -> PortResult<()> {
        // Dropping the transaction on an early return rolls everything back.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        for table in ["tasks", "classes", "subjects"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }

        let mut subject_ids = Vec::with_capacity(data.subjects.len());
        for subject in &data.subjects {
            let id = sqlx::query(
                "INSERT INTO subjects (name, teacher, room, color) VALUES (?, ?, ?, ?)",
            )
            .bind(&subject.name)
            .bind(&subject.teacher)
            .bind(&subject.room)
            .bind(&subject.color)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?
            .last_insert_rowid();
            subject_ids.push(id);
        }

        for class in &data.classes {
            let subject_id = subject_ids.get(class.subject_index).copied().ok_or_else(|| {
                PortError::InvalidInput(format!(
                    "class refers to subject index {} of {}",
                    class.subject_index,
                    subject_ids.len()
                ))
            })?;
            sqlx::query("INSERT INTO classes (subject_id, day_of_week, period) VALUES (?, ?, ?)")
                .bind(subject_id)
                .bind(i64::from(class.day_of_week))
                .bind(i64::from(class.period))
                .execute(&mut *tx)
                .await
                .map_err(unexpected)?;
        }

        tx.commit().await.map_err(unexpected)?;
        info!(
            subjects = data.subjects.len(),
            classes = data.classes.len(),
            "Replaced stored timetable."
        );
        Ok(())
    }

    async fn add_subject(&self, subject: &SubjectInput) -> PortResult<SubjectId> {
        let result =
            sqlx::query("INSERT INTO subjects (name, teacher, room, color) VALUES (?, ?, ?, ?)")
                .bind(&subject.name)
                .bind(&subject.teacher)
                .bind(&subject.room)
                .bind(&subject.color)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(result.last_insert_rowid())
    }

    async fn update_subject(&self, subject: &Subject) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE subjects SET name = ?, teacher = ?, room = ?, color = ? WHERE id = ?",
        )
        .bind(&subject.name)
        .bind(&subject.teacher)
        .bind(&subject.room)
        .bind(&subject.color)
        .bind(subject.id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        ensure_affected(result.rows_affected(), "Subject", subject.id)
    }

    async fn delete_subject(&self, subject_id: SubjectId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = ?")
            .bind(subject_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_affected(result.rows_affected(), "Subject", subject_id)
    }

    async fn get_subject(&self, subject_id: SubjectId) -> PortResult<(Subject, Vec<ClassSession>)> {
        let subject = sqlx::query_as::<_, SubjectRecord>(
            "SELECT id, name, teacher, room, color FROM subjects WHERE id = ?",
        )
        .bind(subject_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("Subject", subject_id))?;

        let classes = sqlx::query_as::<_, ClassRecord>(
            "SELECT id, subject_id, day_of_week, period FROM classes WHERE subject_id = ? ORDER BY id ASC",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok((
            subject.to_domain(),
            classes.into_iter().map(|r| r.to_domain()).collect(),
        ))
    }

    async fn add_class(&self, subject_id: SubjectId, slot: Slot) -> PortResult<ClassId> {
        let result =
            sqlx::query("INSERT INTO classes (subject_id, day_of_week, period) VALUES (?, ?, ?)")
                .bind(subject_id)
                .bind(i64::from(slot.day_of_week))
                .bind(i64::from(slot.period))
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
        Ok(result.last_insert_rowid())
    }

    async fn update_class_slot(&self, subject_id: SubjectId, slot: Slot) -> PortResult<()> {
        sqlx::query("UPDATE classes SET day_of_week = ?, period = ? WHERE subject_id = ?")
            .bind(i64::from(slot.day_of_week))
            .bind(i64::from(slot.period))
            .bind(subject_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn add_task(&self, task: &NewTask, reminder: Option<&ReminderHandle>) -> PortResult<TaskId> {
        let result = sqlx::query(
            "INSERT INTO tasks (subject_id, content, due_date, reminder_id) VALUES (?, ?, ?, ?)",
        )
        .bind(task.subject_id)
        .bind(&task.content)
        .bind(task.due_date)
        .bind(reminder.map(|h| h.0.as_str()))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(result.last_insert_rowid())
    }

    async fn get_task(&self, task_id: TaskId) -> PortResult<Task> {
        let record = sqlx::query_as::<_, TaskRecord>(
            "SELECT id, subject_id, content, due_date, is_done, reminder_id FROM tasks WHERE id = ?",
        )
        .bind(task_id)
        .fetch_one(&self.pool)
        .await
        .map_err(not_found("Task", task_id))?;
        Ok(record.to_domain())
    }

    async fn update_task(
        &self,
        task_id: TaskId,
        content: &str,
        due_date: NaiveDate,
        reminder: Option<&ReminderHandle>,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE tasks SET content = ?, due_date = ?, reminder_id = ? WHERE id = ?",
        )
        .bind(content)
        .bind(due_date)
        .bind(reminder.map(|h| h.0.as_str()))
        .bind(task_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        ensure_affected(result.rows_affected(), "Task", task_id)
    }

    async fn set_task_status(
        &self,
        task_id: TaskId,
        is_done: bool,
        reminder: Option<&ReminderHandle>,
    ) -> PortResult<()> {
        let result = sqlx::query("UPDATE tasks SET is_done = ?, reminder_id = ? WHERE id = ?")
            .bind(is_done)
            .bind(reminder.map(|h| h.0.as_str()))
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_affected(result.rows_affected(), "Task", task_id)
    }

    async fn set_task_reminder(
        &self,
        task_id: TaskId,
        reminder: Option<&ReminderHandle>,
    ) -> PortResult<()> {
        let result = sqlx::query("UPDATE tasks SET reminder_id = ? WHERE id = ?")
            .bind(reminder.map(|h| h.0.as_str()))
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_affected(result.rows_affected(), "Task", task_id)
    }

    async fn clear_reminder(&self, reminder: &ReminderHandle) -> PortResult<()> {
        sqlx::query("UPDATE tasks SET reminder_id = NULL WHERE reminder_id = ?")
            .bind(reminder.0.as_str())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_task(&self, task_id: TaskId) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        ensure_affected(result.rows_affected(), "Task", task_id)
    }

    async fn tasks_for_subject(&self, subject_id: SubjectId) -> PortResult<Vec<Task>> {
        let records = sqlx::query_as::<_, TaskRecord>(
            "SELECT id, subject_id, content, due_date, is_done, reminder_id FROM tasks WHERE subject_id = ? ORDER BY due_date ASC, id ASC",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn all_tasks(&self) -> PortResult<Vec<TaskWithSubject>> {
        let records = sqlx::query_as::<_, TaskWithSubjectRecord>(
            r#"
            SELECT
                tasks.id, tasks.subject_id, tasks.content, tasks.due_date,
                tasks.is_done, tasks.reminder_id,
                subjects.name AS subject_name,
                subjects.color AS subject_color
            FROM tasks
            JOIN subjects ON tasks.subject_id = subjects.id
            ORDER BY tasks.is_done ASC, tasks.due_date ASC, tasks.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn incomplete_task_count(&self) -> PortResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE is_done = 0")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(count as u64)
    }

    async fn incomplete_counts_by_subject(&self) -> PortResult<HashMap<SubjectId, u64>> {
        let records = sqlx::query_as::<_, CountRecord>(
            "SELECT subject_id, COUNT(*) AS count FROM tasks WHERE is_done = 0 GROUP BY subject_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records
            .into_iter()
            .map(|r| (r.subject_id, r.count as u64))
            .collect())
    }

    async fn reminder_handles_for_subject(
        &self,
        subject_id: SubjectId,
    ) -> PortResult<Vec<ReminderHandle>> {
        let handles: Vec<String> = sqlx::query_scalar(
            "SELECT reminder_id FROM tasks WHERE subject_id = ? AND reminder_id IS NOT NULL",
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(handles.into_iter().map(ReminderHandle).collect())
    }
}
