//! Audit & Notification Sink (C6).
//!
//! `AuditSink::record`/`record_denied` are called from inside the same
//! unit of work as the mutation they describe, so the audit row and the
//! mutation commit or roll back together — never fire-and-forget.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{NotificationKind, NotificationQueue};
use crate::error::Result;

pub use memory::InMemoryAuditSink;
pub use postgres::PgAuditSink;

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub report_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Writes one `ActivityLog` row for an accepted mutation, with
    /// action equal to the operation name.
    async fn record(
        &self,
        principal_id: Uuid,
        action: &str,
        target_kind: &str,
        target_id: Uuid,
        details: Value,
    ) -> Result<()>;

    /// Writes one `ActivityLog` row for a denied mutation, with
    /// `action = "<op>.denied"` — user-initiated actions that fail
    /// produce a denied entry carrying the reason.
    async fn record_denied(
        &self,
        principal_id: Uuid,
        op: &str,
        target_kind: &str,
        target_id: Uuid,
        error_kind: &str,
    ) -> Result<()> {
        self.record(
            principal_id,
            &format!("{op}.denied"),
            target_kind,
            target_id,
            serde_json::json!({ "error_kind": error_kind }),
        )
        .await
    }

    async fn enqueue_notification(&self, notification: NewNotification) -> Result<Uuid>;
}
