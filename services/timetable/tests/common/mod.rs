//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::{Arc, Mutex};
use timetable_core::domain::{ReminderHandle, Slot, SubjectId, SubjectInput};
use timetable_core::ports::{NotificationService, PersistenceService, PortResult};
use timetable_lib::adapters::DbAdapter;

/// A migrated in-memory database. The pool is returned too so tests can
/// tamper with the schema.
pub async fn memory_db() -> (Arc<DbAdapter>, SqlitePool) {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let db = DbAdapter::new(pool.clone());
    db.run_migrations().await.unwrap();
    (Arc::new(db), pool)
}

/// Makes every insert into `subjects` fail.
pub async fn break_subject_inserts(pool: &SqlitePool) {
    sqlx::query(
        "CREATE TRIGGER reject_subjects BEFORE INSERT ON subjects \
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    )
    .execute(pool)
    .await
    .unwrap();
}

pub fn subject(name: &str, teacher: Option<&str>, room: Option<&str>) -> SubjectInput {
    SubjectInput {
        name: name.to_string(),
        teacher: teacher.map(str::to_string),
        room: room.map(str::to_string),
        color: "#4caf50".to_string(),
    }
}

pub async fn seed_subject(
    db: &dyn PersistenceService,
    input: SubjectInput,
    day_of_week: u8,
    period: u32,
) -> SubjectId {
    let id = db.add_subject(&input).await.unwrap();
    db.add_class(id, Slot { day_of_week, period }).await.unwrap();
    id
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, hour: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(hour, 0, 0).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    pub handle: ReminderHandle,
    pub title: String,
    pub body: String,
    pub at: NaiveDateTime,
}

/// Notifier with a fixed clock that records every call.
#[derive(Debug)]
pub struct RecordingNotifier {
    now: NaiveDateTime,
    pub scheduled: Mutex<Vec<Scheduled>>,
    pub cancelled: Mutex<Vec<ReminderHandle>>,
}

impl RecordingNotifier {
    pub fn new(now: NaiveDateTime) -> Arc<Self> {
        Arc::new(Self {
            now,
            scheduled: Mutex::new(Vec::new()),
            cancelled: Mutex::new(Vec::new()),
        })
    }

    pub fn scheduled(&self) -> Vec<Scheduled> {
        self.scheduled.lock().unwrap().clone()
    }

    pub fn cancelled(&self) -> Vec<ReminderHandle> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn schedule_reminder(
        &self,
        title: &str,
        body: &str,
        at: NaiveDateTime,
    ) -> PortResult<Option<ReminderHandle>> {
        if at <= self.now {
            return Ok(None);
        }
        let mut scheduled = self.scheduled.lock().unwrap();
        let handle = ReminderHandle(format!("reminder-{}", scheduled.len() + 1));
        scheduled.push(Scheduled {
            handle: handle.clone(),
            title: title.to_string(),
            body: body.to_string(),
            at,
        });
        Ok(Some(handle))
    }

    async fn cancel_reminder(&self, handle: &ReminderHandle) -> PortResult<()> {
        self.cancelled.lock().unwrap().push(handle.clone());
        Ok(())
    }
}
