//! Event Budget Engine (C5).
//!
//! Mirrors the Report Engine's split: pure status-transition and
//! totals-recomputation logic here, [`engine::EventBudgetEngine`] as
//! the transactional shell wiring in authorization, the Fund Ledger,
//! and the Audit Sink.

pub mod engine;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CreateEventInput, Event, EventLineItem, EventStatus, LineItemInput};
use crate::error::{CoreError, Result};

pub use engine::EventBudgetEngine;
pub use memory::InMemoryEventStore;
pub use postgres::PgEventStore;

pub fn is_editable(status: EventStatus) -> bool {
    matches!(status, EventStatus::Draft | EventStatus::PendingRevision)
}

/// The action half of the event state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    Submit,
    RequestRevision,
    Approve,
    Reject,
    Cancel,
}

pub fn next_status(current: EventStatus, action: EventAction) -> Result<EventStatus> {
    use EventAction::*;
    use EventStatus::*;
    let result = match (current, action) {
        (Draft, Submit) => Submitted,
        (PendingRevision, Submit) => Submitted,
        (Submitted, RequestRevision) => PendingRevision,
        (Submitted, Approve) => Approved,
        (Submitted, Reject) => Rejected,
        (PendingRevision, Reject) => Rejected,
        (Draft, Cancel) => Cancelled,
        _ => {
            return Err(CoreError::InvalidTransition {
                from: format!("{current:?}"),
                action: format!("{action:?}"),
            })
        }
    };
    Ok(result)
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create(&self, input: CreateEventInput, created_by: Uuid) -> Result<Event>;
    async fn find(&self, id: Uuid) -> Result<Option<Event>>;
    async fn list_for_fund(&self, fund_id: Uuid) -> Result<Vec<Event>>;

    /// Inserts a line item and recomputes the parent event's
    /// `totals.budget_*` atomically.
    async fn add_line_item(&self, event_id: Uuid, input: LineItemInput) -> Result<EventLineItem>;

    /// Updates a line item's budget fields (only legal while the
    /// parent event is editable) and recomputes budget totals.
    async fn update_line_item(&self, item_id: Uuid, input: LineItemInput) -> Result<EventLineItem>;

    /// Records `actual_amount` against a line item post-approval and
    /// recomputes `totals.actual_*`; never posts ledger rows — actuals
    /// recorded after an event closes do not post additional ledger
    /// rows.
    async fn record_actual(&self, item_id: Uuid, actual_amount: crate::money::Money) -> Result<EventLineItem>;

    async fn delete_line_item(&self, item_id: Uuid) -> Result<()>;
    async fn list_line_items(&self, event_id: Uuid) -> Result<Vec<EventLineItem>>;

    async fn set_status(&self, id: Uuid, status: EventStatus) -> Result<Event>;
    async fn mark_submitted(&self, id: Uuid) -> Result<Event>;
    async fn mark_approved(&self, id: Uuid, approved_by: Uuid) -> Result<Event>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}
