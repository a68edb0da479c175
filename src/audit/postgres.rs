//! PostgreSQL-backed `AuditSink`.
//!
//! Exposes `record_tx`/`enqueue_notification_tx` free functions so the
//! Report and Event engines can write the activity-log row and any
//! notification inside their own unit of work ("written from
//! inside the same unit of work as the mutation they describe").

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::NotificationKind;
use crate::error::Result;

use super::{AuditSink, NewNotification};

pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> PgAuditSink {
        PgAuditSink { pool }
    }
}

fn notification_kind_str(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Processed => "processed",
        NotificationKind::Rejected => "rejected",
        NotificationKind::RevisionRequested => "revision_requested",
    }
}

pub async fn record_tx(
    tx: &mut Transaction<'_, Postgres>,
    principal_id: Uuid,
    action: &str,
    target_kind: &str,
    target_id: Uuid,
    details: Value,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO activity_log (id, principal_id, action, target_kind, target_id, details, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(principal_id)
    .bind(action)
    .bind(target_kind)
    .bind(target_id)
    .bind(details)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn enqueue_notification_tx(
    tx: &mut Transaction<'_, Postgres>,
    notification: &NewNotification,
) -> Result<Uuid> {
    let id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO notification_queue (id, report_id, kind, recipient, subject, body, enqueued_at)
        VALUES ($1, $2, $3, $4, $5, $6, now())
        "#,
    )
    .bind(id)
    .bind(notification.report_id)
    .bind(notification_kind_str(notification.kind))
    .bind(&notification.recipient)
    .bind(&notification.subject)
    .bind(&notification.body)
    .execute(&mut **tx)
    .await?;
    Ok(id)
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(
        &self,
        principal_id: Uuid,
        action: &str,
        target_kind: &str,
        target_id: Uuid,
        details: Value,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        record_tx(&mut tx, principal_id, action, target_kind, target_id, details).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn enqueue_notification(&self, notification: NewNotification) -> Result<Uuid> {
        let mut tx = self.pool.begin().await?;
        let id = enqueue_notification_tx(&mut tx, &notification).await?;
        tx.commit().await?;
        Ok(id)
    }
}
