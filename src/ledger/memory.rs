//! In-memory `FundLedger` fake used by the contract tests in `tests/`,
//! so the end-to-end scenarios and the round-trip properties run
//! without a live Postgres.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{CreateFundInput, Fund, FundTransaction};
use crate::error::{CoreError, Result};
use crate::money::Money;

use super::{
    apply_entry, lock_order, FundLedger, LedgerSliceQuery, PackageInput, PostEntryInput,
    PostedEntry, TransferInput, TransferResult,
};

#[derive(Default)]
struct State {
    balances: HashMap<Uuid, i64>,
    rows: Vec<FundTransaction>,
    funds: HashMap<Uuid, Fund>,
}

pub struct InMemoryFundLedger {
    state: Mutex<State>,
}

impl Default for InMemoryFundLedger {
    fn default() -> Self {
        InMemoryFundLedger::new()
    }
}

impl InMemoryFundLedger {
    pub fn new() -> InMemoryFundLedger {
        InMemoryFundLedger {
            state: Mutex::new(State::default()),
        }
    }

    /// Seeds a fund's starting balance for test setup.
    pub fn seed_balance(&self, fund_id: Uuid, balance: Money) {
        self.state
            .lock()
            .expect("ledger mutex poisoned")
            .balances
            .insert(fund_id, balance.as_i64());
    }

    #[allow(clippy::too_many_arguments)]
    fn insert_row(
        state: &mut State,
        fund_id: Uuid,
        date: NaiveDate,
        concept: &str,
        amount_in: Money,
        amount_out: Money,
        church_id: Option<Uuid>,
        report_id: Option<Uuid>,
        event_id: Option<Uuid>,
        provider_id: Option<Uuid>,
        related_transaction_id: Option<Uuid>,
        created_by: &str,
        allow_overdraw: bool,
    ) -> Result<PostedEntry> {
        let current = Money::from_raw(*state.balances.get(&fund_id).unwrap_or(&0));
        let new_balance = apply_entry(current, amount_in, amount_out, allow_overdraw)?;
        let id = Uuid::new_v4();
        state.rows.push(FundTransaction {
            id,
            date,
            fund_id,
            church_id,
            report_id,
            event_id,
            provider_id,
            concept: concept.to_string(),
            amount_in,
            amount_out,
            balance_after: new_balance,
            related_transaction_id,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        });
        state.balances.insert(fund_id, new_balance.as_i64());
        Ok(PostedEntry {
            transaction_id: id,
            balance_after: new_balance,
        })
    }
}

#[async_trait]
impl FundLedger for InMemoryFundLedger {
    async fn post_entry(&self, input: PostEntryInput) -> Result<PostedEntry> {
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        Self::insert_row(
            &mut state,
            input.fund_id,
            input.date,
            &input.concept,
            input.amount_in,
            input.amount_out,
            input.church_id,
            input.report_id,
            input.event_id,
            input.provider_id,
            None,
            &input.created_by,
            input.allow_overdraw,
        )
    }

    async fn post_transfer(&self, input: TransferInput) -> Result<TransferResult> {
        if input.amount.is_zero() {
            return Err(CoreError::InvalidEntry(
                "transfer amount must be positive".to_string(),
            ));
        }
        // Single mutex stands in for the per-fund row locks the
        // Postgres backend takes in this order; documented here so the
        // two implementations stay conceptually aligned.
        let _ = lock_order(input.source_fund_id, input.dest_fund_id);

        let mut state = self.state.lock().expect("ledger mutex poisoned");
        let related = Uuid::new_v4();
        let out_entry = Self::insert_row(
            &mut state,
            input.source_fund_id,
            input.date,
            &format!("Transfer to fund {}: {}", input.dest_fund_id, input.concept),
            Money::ZERO,
            input.amount,
            None,
            None,
            None,
            None,
            Some(related),
            &input.created_by,
            false,
        )?;
        let in_entry = Self::insert_row(
            &mut state,
            input.dest_fund_id,
            input.date,
            &format!("Transfer from fund {}: {}", input.source_fund_id, input.concept),
            input.amount,
            Money::ZERO,
            None,
            None,
            None,
            None,
            Some(related),
            &input.created_by,
            false,
        )?;
        Ok(TransferResult {
            out_transaction_id: out_entry.transaction_id,
            in_transaction_id: in_entry.transaction_id,
        })
    }

    async fn post_package(&self, package: PackageInput) -> Result<Vec<PostedEntry>> {
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        let mut group_ids: HashMap<u32, Uuid> = HashMap::new();
        let mut posted = Vec::with_capacity(package.entries.len());
        for entry in &package.entries {
            let related = entry
                .link_group
                .map(|group| *group_ids.entry(group).or_insert_with(Uuid::new_v4));
            let posted_entry = Self::insert_row(
                &mut state,
                entry.fund_id,
                package.date,
                &entry.concept,
                entry.amount_in,
                entry.amount_out,
                entry.church_id,
                package.report_id,
                package.event_id,
                entry.provider_id,
                related,
                &package.created_by,
                package.allow_overdraw,
            )?;
            posted.push(posted_entry);
        }
        Ok(posted)
    }

    async fn package_already_posted(&self, report_id: Uuid) -> Result<bool> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        Ok(state
            .rows
            .iter()
            .any(|r| r.report_id == Some(report_id) && r.created_by == FundTransaction::SYSTEM_ACTOR))
    }

    async fn reverse_package(&self, report_id: Uuid) -> Result<()> {
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        let (to_remove, to_keep): (Vec<_>, Vec<_>) = state.rows.drain(..).partition(|row| {
            row.report_id == Some(report_id) && row.created_by == FundTransaction::SYSTEM_ACTOR
        });
        state.rows = to_keep;
        for row in &to_remove {
            let current = *state.balances.get(&row.fund_id).unwrap_or(&0);
            let reverted = current - row.amount_in.as_i64() + row.amount_out.as_i64();
            state.balances.insert(row.fund_id, reverted);
        }
        Ok(())
    }

    async fn balance(&self, fund_id: Uuid) -> Result<Money> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        Ok(Money::from_raw(*state.balances.get(&fund_id).unwrap_or(&0)))
    }

    async fn ledger_slice(&self, query: LedgerSliceQuery) -> Result<Vec<FundTransaction>> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        let mut rows: Vec<FundTransaction> = state
            .rows
            .iter()
            .filter(|r| query.fund_id.map_or(true, |f| f == r.fund_id))
            .filter(|r| query.church_id.map_or(true, |c| Some(c) == r.church_id))
            .filter(|r| query.from.map_or(true, |from| r.date >= from))
            .filter(|r| query.to.map_or(true, |to| r.date <= to))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (a.date, a.created_at, a.id).cmp(&(b.date, b.created_at, b.id)));
        let offset = query.offset.max(0) as usize;
        let limit = if query.limit <= 0 {
            rows.len()
        } else {
            query.limit as usize
        };
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn create_fund(&self, input: CreateFundInput) -> Result<Fund> {
        let mut state = self.state.lock().expect("ledger mutex poisoned");
        if state.funds.values().any(|f| f.code == input.code || f.name == input.name) {
            return Err(CoreError::UniqueViolation(format!(
                "fund code or name already exists: {}",
                input.code
            )));
        }
        let fund = Fund {
            id: Uuid::new_v4(),
            name: input.name,
            code: input.code,
            fund_type: input.fund_type,
            current_balance: Money::ZERO,
            active: true,
        };
        state.funds.insert(fund.id, fund.clone());
        state.balances.insert(fund.id, 0);
        Ok(fund)
    }

    async fn find_fund_by_code(&self, code: &str) -> Result<Option<Fund>> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        Ok(state.funds.values().find(|f| f.code == code).map(|f| Fund {
            current_balance: Money::from_raw(*state.balances.get(&f.id).unwrap_or(&0)),
            ..f.clone()
        }))
    }

    async fn list_funds(&self) -> Result<Vec<Fund>> {
        let state = self.state.lock().expect("ledger mutex poisoned");
        Ok(state
            .funds
            .values()
            .map(|f| Fund {
                current_balance: Money::from_raw(*state.balances.get(&f.id).unwrap_or(&0)),
                ..f.clone()
            })
            .collect())
    }
}
