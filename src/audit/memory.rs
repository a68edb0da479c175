//! In-memory `AuditSink` fake used by contract tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{ActivityLog, NotificationQueue};
use crate::error::Result;

use super::{AuditSink, NewNotification};

#[derive(Default)]
pub struct InMemoryAuditSink {
    rows: Mutex<Vec<ActivityLog>>,
    notifications: Mutex<Vec<NotificationQueue>>,
}

impl InMemoryAuditSink {
    pub fn new() -> InMemoryAuditSink {
        InMemoryAuditSink::default()
    }

    /// Snapshot of logged rows, for test assertions.
    pub fn rows(&self) -> Vec<ActivityLog> {
        self.rows.lock().expect("audit mutex poisoned").clone()
    }

    /// Snapshot of enqueued notifications, for test assertions.
    pub fn notifications(&self) -> Vec<NotificationQueue> {
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .clone()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn record(
        &self,
        principal_id: Uuid,
        action: &str,
        target_kind: &str,
        target_id: Uuid,
        details: Value,
    ) -> Result<()> {
        self.rows.lock().expect("audit mutex poisoned").push(ActivityLog {
            id: Uuid::new_v4(),
            principal_id,
            action: action.to_string(),
            target_kind: target_kind.to_string(),
            target_id,
            details,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn enqueue_notification(&self, notification: NewNotification) -> Result<Uuid> {
        let id = Uuid::new_v4();
        self.notifications
            .lock()
            .expect("notification mutex poisoned")
            .push(NotificationQueue {
                id,
                report_id: notification.report_id,
                kind: notification.kind,
                recipient: notification.recipient,
                subject: notification.subject,
                body: notification.body,
                enqueued_at: Utc::now(),
                consumed_at: None,
            });
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_notification_round_trips() {
        let sink = InMemoryAuditSink::new();
        sink.enqueue_notification(NewNotification {
            report_id: Some(Uuid::new_v4()),
            kind: crate::domain::NotificationKind::Processed,
            recipient: "treasurer@example.org".to_string(),
            subject: "Report processed".to_string(),
            body: "Your report has been approved.".to_string(),
        })
        .await
        .unwrap();
        assert_eq!(sink.notifications().len(), 1);
    }
}
