//! Event budget entities (C5).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Draft,
    PendingRevision,
    Submitted,
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EventTotals {
    pub budget_income: Money,
    pub budget_expense: Money,
    pub actual_income: Money,
    pub actual_expense: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub fund_id: Uuid,
    pub church_id: Option<Uuid>,
    pub name: String,
    pub event_date: NaiveDate,
    pub status: EventStatus,
    pub totals: EventTotals,
    pub created_by: Uuid,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemCategory {
    Income,
    Expense,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLineItem {
    pub id: Uuid,
    pub event_id: Uuid,
    pub category: LineItemCategory,
    pub description: String,
    pub budget_amount: Money,
    pub actual_amount: Money,
    pub notes: Option<String>,
}

impl EventTotals {
    /// Recomputes budget totals from the current line-item set ("on
    /// every line-item change, the parent event's
    /// `totals.budget_*` are recomputed atomically").
    pub fn recompute_budget(items: &[EventLineItem]) -> (Money, Money) {
        let income = items
            .iter()
            .filter(|i| i.category == LineItemCategory::Income)
            .map(|i| i.budget_amount)
            .sum();
        let expense = items
            .iter()
            .filter(|i| i.category == LineItemCategory::Expense)
            .map(|i| i.budget_amount)
            .sum();
        (income, expense)
    }

    pub fn recompute_actual(items: &[EventLineItem]) -> (Money, Money) {
        let income = items
            .iter()
            .filter(|i| i.category == LineItemCategory::Income)
            .map(|i| i.actual_amount)
            .sum();
        let expense = items
            .iter()
            .filter(|i| i.category == LineItemCategory::Expense)
            .map(|i| i.actual_amount)
            .sum();
        (income, expense)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventInput {
    pub fund_id: Uuid,
    pub church_id: Option<Uuid>,
    pub name: String,
    pub event_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineItemInput {
    pub category: LineItemCategory,
    pub description: String,
    pub budget_amount: Money,
    pub notes: Option<String>,
}
