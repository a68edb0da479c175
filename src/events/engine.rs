//! Transactional shell for the Event Budget Engine.

use std::sync::Arc;

use uuid::Uuid;

use crate::assignments::AssignmentStore;
use crate::audit::AuditSink;
use crate::authz::{authorize, Action, AuthzDenial, Target};
use crate::domain::{CreateEventInput, Event, EventLineItem, FundTransaction, LineItemCategory, LineItemInput, Principal};
use crate::error::{CoreError, Result};
use crate::ledger::{FundLedger, PackageEntry, PackageInput};
use crate::money::Money;

use super::{is_editable, next_status, EventAction, EventStore};

fn denial_to_error(denial: AuthzDenial) -> CoreError {
    match denial {
        AuthzDenial::NotAuthenticated => CoreError::NotAuthenticated,
        AuthzDenial::Forbidden => CoreError::Forbidden,
        AuthzDenial::OutOfScope => CoreError::OutOfScope,
    }
}

pub struct EventBudgetEngine {
    events: Arc<dyn EventStore>,
    ledger: Arc<dyn FundLedger>,
    audit: Arc<dyn AuditSink>,
    assignments: Arc<dyn AssignmentStore>,
}

impl EventBudgetEngine {
    pub fn new(
        events: Arc<dyn EventStore>,
        ledger: Arc<dyn FundLedger>,
        audit: Arc<dyn AuditSink>,
        assignments: Arc<dyn AssignmentStore>,
    ) -> EventBudgetEngine {
        EventBudgetEngine {
            events,
            ledger,
            audit,
            assignments,
        }
    }

    async fn guard(
        &self,
        principal: &Principal,
        action: Action,
        target: &Target,
        op: &str,
        target_id: Uuid,
    ) -> Result<()> {
        let assignments = self.assignments.list_for_principal(principal.id).await?;
        match authorize(principal, action, target, &assignments) {
            Ok(()) => Ok(()),
            Err(denial) => {
                let error = denial_to_error(denial);
                self.audit
                    .record_denied(principal.id, op, "Event", target_id, error.kind())
                    .await?;
                Err(error)
            }
        }
    }

    fn target_for(event: &Event) -> Target {
        let mut target = Target::fund(event.fund_id);
        target.church_id = event.church_id;
        target.created_by = Some(event.created_by);
        target
    }

    pub async fn create(&self, principal: &Principal, input: CreateEventInput) -> Result<Event> {
        let mut target = Target::fund(input.fund_id);
        target.church_id = input.church_id;
        self.guard(principal, Action::EventCreate, &target, "event.create", Uuid::nil())
            .await?;
        let event = self.events.create(input, principal.id).await?;
        self.audit
            .record(principal.id, "event.create", "Event", event.id, serde_json::json!({}))
            .await?;
        Ok(event)
    }

    pub async fn add_line_item(
        &self,
        principal: &Principal,
        event_id: Uuid,
        input: LineItemInput,
    ) -> Result<EventLineItem> {
        let event = self.load(event_id).await?;
        let mut target = Self::target_for(&event);
        target.status_is_editable = is_editable(event.status);
        self.guard(principal, Action::EventEdit, &target, "event.line_item.add", event_id)
            .await?;
        if !is_editable(event.status) {
            return Err(CoreError::InvalidTransition {
                from: format!("{:?}", event.status),
                action: "add_line_item".to_string(),
            });
        }
        let item = self.events.add_line_item(event_id, input).await?;
        self.audit
            .record(principal.id, "event.line_item.add", "Event", event_id, serde_json::json!({}))
            .await?;
        Ok(item)
    }

    /// Updates a line item's budget fields while the event is still
    /// editable, mirroring [`Self::add_line_item`]'s guard and
    /// editable-status check.
    pub async fn edit_line_item(
        &self,
        principal: &Principal,
        event_id: Uuid,
        item_id: Uuid,
        input: LineItemInput,
    ) -> Result<EventLineItem> {
        let event = self.load(event_id).await?;
        let mut target = Self::target_for(&event);
        target.status_is_editable = is_editable(event.status);
        self.guard(principal, Action::EventEdit, &target, "event.line_item.edit", event_id)
            .await?;
        if !is_editable(event.status) {
            return Err(CoreError::InvalidTransition {
                from: format!("{:?}", event.status),
                action: "edit_line_item".to_string(),
            });
        }
        let item = self.events.update_line_item(item_id, input).await?;
        self.audit
            .record(principal.id, "event.line_item.edit", "Event", event_id, serde_json::json!({}))
            .await?;
        Ok(item)
    }

    /// Removes a line item while the event is still editable, mirroring
    /// [`Self::add_line_item`]'s guard and editable-status check.
    pub async fn remove_line_item(&self, principal: &Principal, event_id: Uuid, item_id: Uuid) -> Result<()> {
        let event = self.load(event_id).await?;
        let mut target = Self::target_for(&event);
        target.status_is_editable = is_editable(event.status);
        self.guard(principal, Action::EventEdit, &target, "event.line_item.remove", event_id)
            .await?;
        if !is_editable(event.status) {
            return Err(CoreError::InvalidTransition {
                from: format!("{:?}", event.status),
                action: "remove_line_item".to_string(),
            });
        }
        self.events.delete_line_item(item_id).await?;
        self.audit
            .record(
                principal.id,
                "event.line_item.remove",
                "Event",
                event_id,
                serde_json::json!({}),
            )
            .await?;
        Ok(())
    }

    pub async fn record_actual(
        &self,
        principal: &Principal,
        event_id: Uuid,
        item_id: Uuid,
        actual_amount: Money,
    ) -> Result<EventLineItem> {
        let event = self.load(event_id).await?;
        let target = Self::target_for(&event);
        self.guard(principal, Action::EventEdit, &target, "event.line_item.actual", event_id)
            .await?;
        let item = self.events.record_actual(item_id, actual_amount).await?;
        self.audit
            .record(
                principal.id,
                "event.line_item.actual",
                "Event",
                event_id,
                serde_json::json!({}),
            )
            .await?;
        Ok(item)
    }

    pub async fn submit(&self, principal: &Principal, event_id: Uuid) -> Result<Event> {
        let event = self.load(event_id).await?;
        let mut target = Self::target_for(&event);
        target.status_is_editable = is_editable(event.status);
        self.guard(principal, Action::EventSubmit, &target, "event.submit", event_id)
            .await?;
        next_status(event.status, EventAction::Submit)?;
        let updated = self.events.mark_submitted(event_id).await?;
        self.audit
            .record(principal.id, "event.submit", "Event", event_id, serde_json::json!({}))
            .await?;
        Ok(updated)
    }

    pub async fn request_revision(&self, principal: &Principal, event_id: Uuid) -> Result<Event> {
        let event = self.load(event_id).await?;
        let target = Self::target_for(&event);
        self.guard(principal, Action::EventReject, &target, "event.request_revision", event_id)
            .await?;
        let next = next_status(event.status, EventAction::RequestRevision)?;
        let updated = self.events.set_status(event_id, next).await?;
        self.audit
            .record(
                principal.id,
                "event.request_revision",
                "Event",
                event_id,
                serde_json::json!({}),
            )
            .await?;
        Ok(updated)
    }

    pub async fn reject(&self, principal: &Principal, event_id: Uuid) -> Result<Event> {
        let event = self.load(event_id).await?;
        let target = Self::target_for(&event);
        self.guard(principal, Action::EventReject, &target, "event.reject", event_id)
            .await?;
        let next = next_status(event.status, EventAction::Reject)?;
        let updated = self.events.set_status(event_id, next).await?;
        self.audit
            .record(principal.id, "event.reject", "Event", event_id, serde_json::json!({}))
            .await?;
        Ok(updated)
    }

    pub async fn cancel(&self, principal: &Principal, event_id: Uuid) -> Result<Event> {
        let event = self.load(event_id).await?;
        let mut target = Self::target_for(&event);
        target.status_is_editable = is_editable(event.status);
        self.guard(principal, Action::EventEdit, &target, "event.cancel", event_id)
            .await?;
        let next = next_status(event.status, EventAction::Cancel)?;
        let updated = self.events.set_status(event_id, next).await?;
        self.audit
            .record(principal.id, "event.cancel", "Event", event_id, serde_json::json!({}))
            .await?;
        Ok(updated)
    }

    /// Approval side effect : posts one ledger row per
    /// budget line item against the event's single fund — positive for
    /// `income`, negative for `expense` — then marks the event
    /// approved. Actuals recorded afterward never post further rows.
    pub async fn approve(&self, principal: &Principal, event_id: Uuid) -> Result<Event> {
        let event = self.load(event_id).await?;
        let target = Self::target_for(&event);
        self.guard(principal, Action::EventApprove, &target, "event.approve", event_id)
            .await?;
        next_status(event.status, EventAction::Approve)?;

        let items = self.events.list_line_items(event_id).await?;
        let entries: Vec<PackageEntry> = items
            .iter()
            .filter(|item| !item.budget_amount.is_zero())
            .map(|item| {
                let (amount_in, amount_out) = match item.category {
                    LineItemCategory::Income => (item.budget_amount, Money::ZERO),
                    LineItemCategory::Expense => (Money::ZERO, item.budget_amount),
                };
                PackageEntry {
                    fund_id: event.fund_id,
                    concept: format!("{}: {}", event.name, item.description),
                    amount_in,
                    amount_out,
                    church_id: event.church_id,
                    provider_id: None,
                    link_group: None,
                }
            })
            .collect();

        if !entries.is_empty() {
            self.ledger
                .post_package(PackageInput {
                    date: event.event_date,
                    report_id: None,
                    event_id: Some(event.id),
                    created_by: FundTransaction::SYSTEM_ACTOR.to_string(),
                    allow_overdraw: false,
                    entries,
                })
                .await?;
        }

        let updated = self.events.mark_approved(event_id, principal.id).await?;
        self.audit
            .record(principal.id, "event.approve", "Event", event_id, serde_json::json!({}))
            .await?;
        Ok(updated)
    }

    async fn load(&self, event_id: Uuid) -> Result<Event> {
        self.events.find(event_id).await?.ok_or_else(|| CoreError::NotFound {
            kind: "Event".to_string(),
            id: event_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignments::InMemoryAssignmentStore;
    use crate::audit::InMemoryAuditSink;
    use crate::domain::{CreateAssignmentInput, CreateFundInput, FundType, LineItemCategory, Role};
    use crate::events::InMemoryEventStore;
    use crate::ledger::InMemoryFundLedger;
    use chrono::NaiveDate;

    async fn setup() -> (EventBudgetEngine, Principal, Uuid) {
        let ledger = Arc::new(InMemoryFundLedger::new());
        let fund = ledger
            .create_fund(CreateFundInput {
                name: "Caballeros".to_string(),
                code: "CABALLEROS".to_string(),
                fund_type: FundType::Designated,
            })
            .await
            .unwrap();
        ledger.seed_balance(fund.id, Money::new(1_000_000).unwrap());

        let events = Arc::new(InMemoryEventStore::new());
        let audit = Arc::new(InMemoryAuditSink::new());
        let assignments: Arc<dyn AssignmentStore> = Arc::new(InMemoryAssignmentStore::new());

        let director = Principal {
            id: Uuid::new_v4(),
            email: "director@example.org".to_string(),
            full_name: "Director de Fondo".to_string(),
            role: Role::FundDirector,
            church_scope: None,
            active: true,
        };
        assignments
            .create(CreateAssignmentInput {
                principal_id: director.id,
                fund_id: Some(fund.id),
                church_scope: None,
            })
            .await
            .unwrap();

        let engine = EventBudgetEngine::new(events, ledger, audit, assignments);
        (engine, director, fund.id)
    }

    #[tokio::test]
    async fn approval_posts_budget_line_items_to_event_fund() {
        let (engine, director, fund_id) = setup().await;
        let event = engine
            .create(
                &director,
                CreateEventInput {
                    fund_id,
                    church_id: None,
                    name: "Retiro".to_string(),
                    event_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                },
            )
            .await
            .unwrap();

        engine
            .add_line_item(
                &director,
                event.id,
                LineItemInput {
                    category: LineItemCategory::Income,
                    description: "Inscripciones".to_string(),
                    budget_amount: Money::new(300_000).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();
        engine
            .add_line_item(
                &director,
                event.id,
                LineItemInput {
                    category: LineItemCategory::Expense,
                    description: "Alquiler".to_string(),
                    budget_amount: Money::new(100_000).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();

        engine.submit(&director, event.id).await.unwrap();

        let treasurer = Principal {
            role: crate::domain::Role::Treasurer,
            church_scope: Some(Uuid::new_v4()),
            ..director.clone()
        };
        let approved = engine.approve(&treasurer, event.id).await.unwrap();
        assert_eq!(approved.status, crate::domain::EventStatus::Approved);

        let balance = engine.ledger.balance(fund_id).await.unwrap();
        assert_eq!(balance.as_i64(), 1_000_000 + 300_000 - 100_000);
    }

    #[tokio::test]
    async fn edit_line_item_updates_budget_amount_while_draft() {
        let (engine, director, fund_id) = setup().await;
        let event = engine
            .create(
                &director,
                CreateEventInput {
                    fund_id,
                    church_id: None,
                    name: "Retiro".to_string(),
                    event_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                },
            )
            .await
            .unwrap();

        let item = engine
            .add_line_item(
                &director,
                event.id,
                LineItemInput {
                    category: LineItemCategory::Income,
                    description: "Inscripciones".to_string(),
                    budget_amount: Money::new(300_000).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();

        let edited = engine
            .edit_line_item(
                &director,
                event.id,
                item.id,
                LineItemInput {
                    category: LineItemCategory::Income,
                    description: "Inscripciones".to_string(),
                    budget_amount: Money::new(350_000).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.budget_amount.as_i64(), 350_000);

        engine.remove_line_item(&director, event.id, item.id).await.unwrap();
        let items = engine.events.list_line_items(event.id).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn edit_line_item_rejected_once_event_is_submitted() {
        let (engine, director, fund_id) = setup().await;
        let event = engine
            .create(
                &director,
                CreateEventInput {
                    fund_id,
                    church_id: None,
                    name: "Retiro".to_string(),
                    event_date: NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
                },
            )
            .await
            .unwrap();
        let item = engine
            .add_line_item(
                &director,
                event.id,
                LineItemInput {
                    category: LineItemCategory::Income,
                    description: "Inscripciones".to_string(),
                    budget_amount: Money::new(300_000).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();

        engine.submit(&director, event.id).await.unwrap();

        let err = engine
            .edit_line_item(
                &director,
                event.id,
                item.id,
                LineItemInput {
                    category: LineItemCategory::Income,
                    description: "Inscripciones".to_string(),
                    budget_amount: Money::new(400_000).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));

        let err = engine.remove_line_item(&director, event.id, item.id).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
    }
}
