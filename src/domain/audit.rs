//! Audit log and outbound notification queue entities (C6).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    pub id: Uuid,
    pub principal_id: Uuid,
    /// Operation name, e.g. `report.approve`; denied mutations use
    /// `<op>.denied`.
    pub action: String,
    pub target_kind: String,
    pub target_id: Uuid,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Processed,
    Rejected,
    RevisionRequested,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationQueue {
    pub id: Uuid,
    pub report_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub enqueued_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}
