//! In-memory `EventStore` fake used by the contract tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::{CreateEventInput, Event, EventLineItem, EventStatus, EventTotals, LineItemInput};
use crate::error::{CoreError, Result};
use crate::money::Money;

use super::EventStore;

#[derive(Default)]
struct State {
    events: HashMap<Uuid, Event>,
    items: HashMap<Uuid, Vec<EventLineItem>>,
}

#[derive(Default)]
pub struct InMemoryEventStore {
    state: Mutex<State>,
}

impl InMemoryEventStore {
    pub fn new() -> InMemoryEventStore {
        InMemoryEventStore::default()
    }

    fn get(state: &State, id: Uuid) -> Result<Event> {
        state.events.get(&id).cloned().ok_or_else(|| CoreError::NotFound {
            kind: "Event".to_string(),
            id: id.to_string(),
        })
    }

    fn find_item(state: &State, item_id: Uuid) -> Result<(Uuid, EventLineItem)> {
        for (event_id, items) in &state.items {
            if let Some(item) = items.iter().find(|i| i.id == item_id) {
                return Ok((*event_id, item.clone()));
            }
        }
        Err(CoreError::NotFound {
            kind: "EventLineItem".to_string(),
            id: item_id.to_string(),
        })
    }

    fn recompute_budget(state: &mut State, event_id: Uuid) {
        let items = state.items.get(&event_id).cloned().unwrap_or_default();
        let (budget_income, budget_expense) = EventTotals::recompute_budget(&items);
        if let Some(event) = state.events.get_mut(&event_id) {
            event.totals.budget_income = budget_income;
            event.totals.budget_expense = budget_expense;
        }
    }

    fn recompute_actual(state: &mut State, event_id: Uuid) {
        let items = state.items.get(&event_id).cloned().unwrap_or_default();
        let (actual_income, actual_expense) = EventTotals::recompute_actual(&items);
        if let Some(event) = state.events.get_mut(&event_id) {
            event.totals.actual_income = actual_income;
            event.totals.actual_expense = actual_expense;
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn create(&self, input: CreateEventInput, created_by: Uuid) -> Result<Event> {
        let mut state = self.state.lock().expect("event store mutex poisoned");
        let id = Uuid::new_v4();
        let event = Event {
            id,
            fund_id: input.fund_id,
            church_id: input.church_id,
            name: input.name,
            event_date: input.event_date,
            status: EventStatus::Draft,
            totals: EventTotals::default(),
            created_by,
            approved_by: None,
            approved_at: None,
            submitted_at: None,
        };
        state.events.insert(id, event.clone());
        state.items.insert(id, Vec::new());
        Ok(event)
    }

    async fn find(&self, id: Uuid) -> Result<Option<Event>> {
        let state = self.state.lock().expect("event store mutex poisoned");
        Ok(state.events.get(&id).cloned())
    }

    async fn list_for_fund(&self, fund_id: Uuid) -> Result<Vec<Event>> {
        let state = self.state.lock().expect("event store mutex poisoned");
        Ok(state.events.values().filter(|e| e.fund_id == fund_id).cloned().collect())
    }

    async fn add_line_item(&self, event_id: Uuid, input: LineItemInput) -> Result<EventLineItem> {
        let mut state = self.state.lock().expect("event store mutex poisoned");
        Self::get(&state, event_id)?;
        let item = EventLineItem {
            id: Uuid::new_v4(),
            event_id,
            category: input.category,
            description: input.description,
            budget_amount: input.budget_amount,
            actual_amount: Money::ZERO,
            notes: input.notes,
        };
        state.items.entry(event_id).or_default().push(item.clone());
        Self::recompute_budget(&mut state, event_id);
        Ok(item)
    }

    async fn update_line_item(&self, item_id: Uuid, input: LineItemInput) -> Result<EventLineItem> {
        let mut state = self.state.lock().expect("event store mutex poisoned");
        let (event_id, _) = Self::find_item(&state, item_id)?;
        let items = state.items.get_mut(&event_id).expect("event id just resolved");
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .expect("item id just resolved");
        item.category = input.category;
        item.description = input.description;
        item.budget_amount = input.budget_amount;
        item.notes = input.notes;
        let updated = item.clone();
        Self::recompute_budget(&mut state, event_id);
        Ok(updated)
    }

    async fn record_actual(&self, item_id: Uuid, actual_amount: Money) -> Result<EventLineItem> {
        let mut state = self.state.lock().expect("event store mutex poisoned");
        let (event_id, _) = Self::find_item(&state, item_id)?;
        let items = state.items.get_mut(&event_id).expect("event id just resolved");
        let item = items
            .iter_mut()
            .find(|i| i.id == item_id)
            .expect("item id just resolved");
        item.actual_amount = actual_amount;
        let updated = item.clone();
        Self::recompute_actual(&mut state, event_id);
        Ok(updated)
    }

    async fn delete_line_item(&self, item_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().expect("event store mutex poisoned");
        let (event_id, _) = Self::find_item(&state, item_id)?;
        if let Some(items) = state.items.get_mut(&event_id) {
            items.retain(|i| i.id != item_id);
        }
        Self::recompute_budget(&mut state, event_id);
        Self::recompute_actual(&mut state, event_id);
        Ok(())
    }

    async fn list_line_items(&self, event_id: Uuid) -> Result<Vec<EventLineItem>> {
        let state = self.state.lock().expect("event store mutex poisoned");
        Ok(state.items.get(&event_id).cloned().unwrap_or_default())
    }

    async fn set_status(&self, id: Uuid, status: EventStatus) -> Result<Event> {
        let mut state = self.state.lock().expect("event store mutex poisoned");
        let mut event = Self::get(&state, id)?;
        event.status = status;
        state.events.insert(id, event.clone());
        Ok(event)
    }

    async fn mark_submitted(&self, id: Uuid) -> Result<Event> {
        let mut state = self.state.lock().expect("event store mutex poisoned");
        let mut event = Self::get(&state, id)?;
        event.status = EventStatus::Submitted;
        event.submitted_at = Some(Utc::now());
        state.events.insert(id, event.clone());
        Ok(event)
    }

    async fn mark_approved(&self, id: Uuid, approved_by: Uuid) -> Result<Event> {
        let mut state = self.state.lock().expect("event store mutex poisoned");
        let mut event = Self::get(&state, id)?;
        event.status = EventStatus::Approved;
        event.approved_by = Some(approved_by);
        event.approved_at = Some(Utc::now());
        state.events.insert(id, event.clone());
        Ok(event)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.lock().expect("event store mutex poisoned");
        state.events.remove(&id);
        state.items.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LineItemCategory;
    use chrono::NaiveDate;

    fn create_input(fund_id: Uuid) -> CreateEventInput {
        CreateEventInput {
            fund_id,
            church_id: None,
            name: "Campamento de jovenes".to_string(),
            event_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn adding_line_items_recomputes_budget_totals() {
        let store = InMemoryEventStore::new();
        let event = store.create(create_input(Uuid::new_v4()), Uuid::new_v4()).await.unwrap();

        store
            .add_line_item(
                event.id,
                LineItemInput {
                    category: LineItemCategory::Income,
                    description: "Inscripciones".to_string(),
                    budget_amount: Money::new(200_000).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();
        store
            .add_line_item(
                event.id,
                LineItemInput {
                    category: LineItemCategory::Expense,
                    description: "Alquiler de predio".to_string(),
                    budget_amount: Money::new(150_000).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();

        let updated = store.find(event.id).await.unwrap().unwrap();
        assert_eq!(updated.totals.budget_income.as_i64(), 200_000);
        assert_eq!(updated.totals.budget_expense.as_i64(), 150_000);
    }

    #[tokio::test]
    async fn recording_actuals_does_not_touch_budget_totals() {
        let store = InMemoryEventStore::new();
        let event = store.create(create_input(Uuid::new_v4()), Uuid::new_v4()).await.unwrap();
        let item = store
            .add_line_item(
                event.id,
                LineItemInput {
                    category: LineItemCategory::Income,
                    description: "Inscripciones".to_string(),
                    budget_amount: Money::new(200_000).unwrap(),
                    notes: None,
                },
            )
            .await
            .unwrap();

        store.record_actual(item.id, Money::new(210_000).unwrap()).await.unwrap();
        let updated = store.find(event.id).await.unwrap().unwrap();
        assert_eq!(updated.totals.actual_income.as_i64(), 210_000);
        assert_eq!(updated.totals.budget_income.as_i64(), 200_000);
    }
}
