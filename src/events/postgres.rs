//! PostgreSQL-backed `EventStore`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{
    CreateEventInput, Event, EventLineItem, EventStatus, EventTotals, LineItemCategory, LineItemInput,
};
use crate::error::{CoreError, Result};
use crate::money::Money;

use super::EventStore;

pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> PgEventStore {
        PgEventStore { pool }
    }
}

fn status_str(status: EventStatus) -> &'static str {
    match status {
        EventStatus::Draft => "draft",
        EventStatus::PendingRevision => "pending_revision",
        EventStatus::Submitted => "submitted",
        EventStatus::Approved => "approved",
        EventStatus::Rejected => "rejected",
        EventStatus::Cancelled => "cancelled",
    }
}

fn parse_status(s: &str) -> EventStatus {
    match s {
        "pending_revision" => EventStatus::PendingRevision,
        "submitted" => EventStatus::Submitted,
        "approved" => EventStatus::Approved,
        "rejected" => EventStatus::Rejected,
        "cancelled" => EventStatus::Cancelled,
        _ => EventStatus::Draft,
    }
}

fn category_str(category: LineItemCategory) -> &'static str {
    match category {
        LineItemCategory::Income => "income",
        LineItemCategory::Expense => "expense",
    }
}

fn parse_category(s: &str) -> LineItemCategory {
    if s == "expense" {
        LineItemCategory::Expense
    } else {
        LineItemCategory::Income
    }
}

const EVENT_COLUMNS: &str = "id, fund_id, church_id, name, event_date, status, \
    budget_income, budget_expense, actual_income, actual_expense, \
    created_by, approved_by, approved_at, submitted_at";

fn row_to_event(row: sqlx::postgres::PgRow) -> Event {
    Event {
        id: row.get("id"),
        fund_id: row.get("fund_id"),
        church_id: row.get("church_id"),
        name: row.get("name"),
        event_date: row.get("event_date"),
        status: parse_status(row.get::<String, _>("status").as_str()),
        totals: EventTotals {
            budget_income: Money::from_raw(row.get("budget_income")),
            budget_expense: Money::from_raw(row.get("budget_expense")),
            actual_income: Money::from_raw(row.get("actual_income")),
            actual_expense: Money::from_raw(row.get("actual_expense")),
        },
        created_by: row.get("created_by"),
        approved_by: row.get("approved_by"),
        approved_at: row.get("approved_at"),
        submitted_at: row.get("submitted_at"),
    }
}

fn row_to_item(row: sqlx::postgres::PgRow) -> EventLineItem {
    EventLineItem {
        id: row.get("id"),
        event_id: row.get("event_id"),
        category: parse_category(row.get::<String, _>("category").as_str()),
        description: row.get("description"),
        budget_amount: Money::from_raw(row.get("budget_amount")),
        actual_amount: Money::from_raw(row.get("actual_amount")),
        notes: row.get("notes"),
    }
}

impl PgEventStore {
    async fn recompute_budget(&self, event_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE events SET \
             budget_income = COALESCE((SELECT SUM(budget_amount) FROM event_line_items \
                WHERE event_id = $1 AND category = 'income'), 0), \
             budget_expense = COALESCE((SELECT SUM(budget_amount) FROM event_line_items \
                WHERE event_id = $1 AND category = 'expense'), 0) \
             WHERE id = $1",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn recompute_actual(&self, event_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE events SET \
             actual_income = COALESCE((SELECT SUM(actual_amount) FROM event_line_items \
                WHERE event_id = $1 AND category = 'income'), 0), \
             actual_expense = COALESCE((SELECT SUM(actual_amount) FROM event_line_items \
                WHERE event_id = $1 AND category = 'expense'), 0) \
             WHERE id = $1",
        )
        .bind(event_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn create(&self, input: CreateEventInput, created_by: Uuid) -> Result<Event> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO events (id, fund_id, church_id, name, event_date, status, \
             budget_income, budget_expense, actual_income, actual_expense, created_by) \
             VALUES ($1, $2, $3, $4, $5, 'draft', 0, 0, 0, 0, $6)",
        )
        .bind(id)
        .bind(input.fund_id)
        .bind(input.church_id)
        .bind(&input.name)
        .bind(input.event_date)
        .bind(created_by)
        .execute(&self.pool)
        .await?;
        self.find(id).await?.ok_or_else(|| CoreError::NotFound {
            kind: "Event".to_string(),
            id: id.to_string(),
        })
    }

    async fn find(&self, id: Uuid) -> Result<Option<Event>> {
        let row = sqlx::query(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_event))
    }

    async fn list_for_fund(&self, fund_id: Uuid) -> Result<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE fund_id = $1 ORDER BY event_date DESC"
        ))
        .bind(fund_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_event).collect())
    }

    async fn add_line_item(&self, event_id: Uuid, input: LineItemInput) -> Result<EventLineItem> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO event_line_items (id, event_id, category, description, budget_amount, \
             actual_amount, notes) VALUES ($1, $2, $3, $4, $5, 0, $6)",
        )
        .bind(id)
        .bind(event_id)
        .bind(category_str(input.category))
        .bind(&input.description)
        .bind(input.budget_amount.as_i64())
        .bind(&input.notes)
        .execute(&self.pool)
        .await?;
        self.recompute_budget(event_id).await?;
        let row = sqlx::query(
            "SELECT id, event_id, category, description, budget_amount, actual_amount, notes \
             FROM event_line_items WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_item(row))
    }

    async fn update_line_item(&self, item_id: Uuid, input: LineItemInput) -> Result<EventLineItem> {
        let row = sqlx::query("SELECT event_id FROM event_line_items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                kind: "EventLineItem".to_string(),
                id: item_id.to_string(),
            })?;
        let event_id: Uuid = row.get("event_id");

        sqlx::query(
            "UPDATE event_line_items SET category = $1, description = $2, budget_amount = $3, \
             notes = $4 WHERE id = $5",
        )
        .bind(category_str(input.category))
        .bind(&input.description)
        .bind(input.budget_amount.as_i64())
        .bind(&input.notes)
        .bind(item_id)
        .execute(&self.pool)
        .await?;
        self.recompute_budget(event_id).await?;

        let row = sqlx::query(
            "SELECT id, event_id, category, description, budget_amount, actual_amount, notes \
             FROM event_line_items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_item(row))
    }

    async fn record_actual(&self, item_id: Uuid, actual_amount: Money) -> Result<EventLineItem> {
        let row = sqlx::query("SELECT event_id FROM event_line_items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                kind: "EventLineItem".to_string(),
                id: item_id.to_string(),
            })?;
        let event_id: Uuid = row.get("event_id");

        sqlx::query("UPDATE event_line_items SET actual_amount = $1 WHERE id = $2")
            .bind(actual_amount.as_i64())
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        self.recompute_actual(event_id).await?;

        let row = sqlx::query(
            "SELECT id, event_id, category, description, budget_amount, actual_amount, notes \
             FROM event_line_items WHERE id = $1",
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row_to_item(row))
    }

    async fn delete_line_item(&self, item_id: Uuid) -> Result<()> {
        let row = sqlx::query("SELECT event_id FROM event_line_items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                kind: "EventLineItem".to_string(),
                id: item_id.to_string(),
            })?;
        let event_id: Uuid = row.get("event_id");

        sqlx::query("DELETE FROM event_line_items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await?;
        self.recompute_budget(event_id).await?;
        self.recompute_actual(event_id).await?;
        Ok(())
    }

    async fn list_line_items(&self, event_id: Uuid) -> Result<Vec<EventLineItem>> {
        let rows = sqlx::query(
            "SELECT id, event_id, category, description, budget_amount, actual_amount, notes \
             FROM event_line_items WHERE event_id = $1",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_item).collect())
    }

    async fn set_status(&self, id: Uuid, status: EventStatus) -> Result<Event> {
        sqlx::query("UPDATE events SET status = $1 WHERE id = $2")
            .bind(status_str(status))
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.find(id).await?.ok_or_else(|| CoreError::NotFound {
            kind: "Event".to_string(),
            id: id.to_string(),
        })
    }

    async fn mark_submitted(&self, id: Uuid) -> Result<Event> {
        sqlx::query("UPDATE events SET status = 'submitted', submitted_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.find(id).await?.ok_or_else(|| CoreError::NotFound {
            kind: "Event".to_string(),
            id: id.to_string(),
        })
    }

    async fn mark_approved(&self, id: Uuid, approved_by: Uuid) -> Result<Event> {
        sqlx::query(
            "UPDATE events SET status = 'approved', approved_by = $1, approved_at = now() WHERE id = $2",
        )
        .bind(approved_by)
        .bind(id)
        .execute(&self.pool)
        .await?;
        self.find(id).await?.ok_or_else(|| CoreError::NotFound {
            kind: "Event".to_string(),
            id: id.to_string(),
        })
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM event_line_items WHERE event_id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
