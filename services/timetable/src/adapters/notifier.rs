//! services/timetable/src/adapters/notifier.rs
//!
//! An in-process implementation of the `NotificationService` port.
//! Each pending reminder is a tokio task that sleeps until its trigger time and
//! can be cancelled through its `CancellationToken`. Reminders do not survive a
//! restart; `TaskPlanner::rearm_reminders` schedules them again.

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use timetable_core::domain::ReminderHandle;
use timetable_core::ports::{NotificationService, PortError, PortResult};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// A reminder that has come due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub handle: ReminderHandle,
    pub title: String,
    pub body: String,
    pub at: NaiveDateTime,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone, Default)]
pub struct LocalNotifier {
    pending: Arc<Mutex<HashMap<ReminderHandle, CancellationToken>>>,
    delivery: Option<mpsc::UnboundedSender<Reminder>>,
}

impl LocalNotifier {
    /// Creates a notifier that only logs reminders when they fire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that also forwards fired reminders to `delivery`.
    pub fn with_delivery(delivery: mpsc::UnboundedSender<Reminder>) -> Self {
        Self {
            pending: Arc::default(),
            delivery: Some(delivery),
        }
    }

    /// Number of reminders scheduled and not yet fired or cancelled.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn registry(
        &self,
    ) -> PortResult<std::sync::MutexGuard<'_, HashMap<ReminderHandle, CancellationToken>>> {
        self.pending
            .lock()
            .map_err(|_| PortError::Unexpected("reminder registry is poisoned".to_string()))
    }
}

//=========================================================================================
// `NotificationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl NotificationService for LocalNotifier {
    async fn schedule_reminder(
        &self,
        title: &str,
        body: &str,
        at: NaiveDateTime,
    ) -> PortResult<Option<ReminderHandle>> {
        let now = Local::now().naive_local();
        if at <= now {
            debug!(%at, "Reminder time already passed; nothing scheduled.");
            return Ok(None);
        }
        let delay = (at - now)
            .to_std()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let handle = ReminderHandle(Uuid::new_v4().to_string());
        let token = CancellationToken::new();
        self.registry()?.insert(handle.clone(), token.clone());

        let reminder = Reminder {
            handle: handle.clone(),
            title: title.to_string(),
            body: body.to_string(),
            at,
        };
        let pending = self.pending.clone();
        let delivery = self.delivery.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(handle = %reminder.handle, "Reminder cancelled.");
                }
                _ = tokio::time::sleep(delay) => {
                    if let Ok(mut pending) = pending.lock() {
                        pending.remove(&reminder.handle);
                    }
                    info!(title = %reminder.title, body = %reminder.body, "Reminder due.");
                    if let Some(delivery) = delivery {
                        let _ = delivery.send(reminder);
                    }
                }
            }
        });

        debug!(%handle, %at, "Reminder scheduled.");
        Ok(Some(handle))
    }

    async fn cancel_reminder(&self, handle: &ReminderHandle) -> PortResult<()> {
        if let Some(token) = self.registry()?.remove(handle) {
            token.cancel();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_past_time_schedules_nothing() {
        let notifier = LocalNotifier::new();
        let yesterday = Local::now().naive_local() - chrono::Duration::days(1);

        let handle = notifier
            .schedule_reminder("Due today", "Essay", yesterday)
            .await
            .unwrap();

        assert!(handle.is_none());
        assert_eq!(notifier.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_removes_pending_reminder() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = LocalNotifier::with_delivery(tx);
        let soon = Local::now().naive_local() + chrono::Duration::milliseconds(150);

        let handle = notifier
            .schedule_reminder("Due today", "Essay", soon)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notifier.pending_count(), 1);

        notifier.cancel_reminder(&handle).await.unwrap();
        assert_eq!(notifier.pending_count(), 0);

        let fired = tokio::time::timeout(Duration::from_millis(400), rx.recv()).await;
        assert!(fired.is_err(), "cancelled reminder must not fire");
    }

    #[tokio::test]
    async fn test_reminder_fires_and_is_delivered() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = LocalNotifier::with_delivery(tx);
        let soon = Local::now().naive_local() + chrono::Duration::milliseconds(50);

        let handle = notifier
            .schedule_reminder("Due today", "Lab report", soon)
            .await
            .unwrap()
            .unwrap();

        let reminder = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reminder.handle, handle);
        assert_eq!(reminder.body, "Lab report");
        assert_eq!(notifier.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_handle_is_ok() {
        let notifier = LocalNotifier::new();
        notifier
            .cancel_reminder(&ReminderHandle("missing".to_string()))
            .await
            .unwrap();
    }
}
