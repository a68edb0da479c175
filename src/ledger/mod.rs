//! Fund Ledger (C2).
//!
//! The ledger is the sole writer of `fund.current_balance`; every other
//! component reads balances through [`FundLedger::balance`] /
//! [`FundLedger::ledger_slice`] and posts movements through
//! [`FundLedger::post_entry`]/[`FundLedger::post_transfer`]/
//! [`FundLedger::post_package`] rather than touching fund rows directly
//! enforcing the shared-resource policy.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::{CreateFundInput, Fund, FundTransaction};
use crate::error::{CoreError, Result};
use crate::money::Money;

pub use memory::InMemoryFundLedger;
pub use postgres::PgFundLedger;

#[derive(Debug, Clone)]
pub struct PostEntryInput {
    pub date: NaiveDate,
    pub fund_id: Uuid,
    pub concept: String,
    pub amount_in: Money,
    pub amount_out: Money,
    pub church_id: Option<Uuid>,
    pub report_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub created_by: String,
    /// Available only to `report.approve` postings for book entries
    /// against amounts already physically received; never set from a
    /// user-initiated transfer.
    pub allow_overdraw: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostedEntry {
    pub transaction_id: Uuid,
    pub balance_after: Money,
}

#[derive(Debug, Clone)]
pub struct TransferInput {
    pub date: NaiveDate,
    pub source_fund_id: Uuid,
    pub dest_fund_id: Uuid,
    pub amount: Money,
    pub concept: String,
    pub created_by: String,
}

#[derive(Debug, Clone, Copy)]
pub struct TransferResult {
    pub out_transaction_id: Uuid,
    pub in_transaction_id: Uuid,
}

/// One row of a multi-row package posted atomically by
/// [`FundLedger::post_package`]. Entries sharing a `link_group` are
/// tagged with a common `related_transaction_id`, mirroring the
/// "linked pair" rows the report package calls for.
#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub fund_id: Uuid,
    pub concept: String,
    pub amount_in: Money,
    pub amount_out: Money,
    pub church_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub link_group: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct PackageInput {
    pub date: NaiveDate,
    pub report_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub created_by: String,
    pub allow_overdraw: bool,
    pub entries: Vec<PackageEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct LedgerSliceQuery {
    pub fund_id: Option<Uuid>,
    pub church_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: i64,
    pub offset: i64,
}

/// The ledger's public surface. `PgFundLedger` backs production use;
/// `InMemoryFundLedger` backs the contract tests in `tests/`, so the
/// end-to-end scenarios run without a live Postgres.
#[async_trait]
pub trait FundLedger: Send + Sync {
    async fn post_entry(&self, input: PostEntryInput) -> Result<PostedEntry>;
    async fn post_transfer(&self, input: TransferInput) -> Result<TransferResult>;
    async fn post_package(&self, package: PackageInput) -> Result<Vec<PostedEntry>>;

    /// Whether a system-posted package already exists for this report,
    /// so a retried `approve` can skip re-posting instead of
    /// double-booking the ledger rows.
    async fn package_already_posted(&self, report_id: Uuid) -> Result<bool>;

    async fn reverse_package(&self, report_id: Uuid) -> Result<()>;
    async fn balance(&self, fund_id: Uuid) -> Result<Money>;
    async fn ledger_slice(&self, query: LedgerSliceQuery) -> Result<Vec<FundTransaction>>;

    /// Registers a fund; the fund set is bootstrapped once, and
    /// idempotent callers check `find_by_code` first. Not part of the
    /// append-only transaction log — funds are the ledger's accounts,
    /// created once at setup time.
    async fn create_fund(&self, input: CreateFundInput) -> Result<Fund>;
    async fn find_fund_by_code(&self, code: &str) -> Result<Option<Fund>>;
    async fn list_funds(&self) -> Result<Vec<Fund>>;
}

/// Computes the post-entry balance and enforces the non-negative
/// invariant, shared by both backends so the rule is
/// defined exactly once.
pub(crate) fn apply_entry(
    current_balance: Money,
    amount_in: Money,
    amount_out: Money,
    allow_overdraw: bool,
) -> Result<Money> {
    FundTransaction::validate_single_sided(amount_in, amount_out)?;
    let candidate = current_balance + amount_in;
    match candidate.checked_sub(amount_out) {
        Some(new_balance) => Ok(new_balance),
        None if allow_overdraw => Ok(Money::from_raw(candidate.as_i64() - amount_out.as_i64())),
        None => Err(CoreError::InsufficientFunds {
            balance: current_balance.as_i64(),
            amount: amount_out.as_i64(),
        }),
    }
}

/// Lock order for a fund pair so concurrent transfers touching the same
/// two funds never deadlock ("always locking the lower fund
/// id first").
pub(crate) fn lock_order(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_entry_rejects_overdraw_by_default() {
        let balance = Money::new(50_000).unwrap();
        let out = Money::new(80_000).unwrap();
        let err = apply_entry(balance, Money::ZERO, out, false).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientFunds { .. }));
    }

    #[test]
    fn apply_entry_records_true_negative_balance_when_overdraw_allowed() {
        let balance = Money::new(50_000).unwrap();
        let out = Money::new(80_000).unwrap();
        let result = apply_entry(balance, Money::ZERO, out, true).unwrap();
        assert_eq!(result.as_i64(), -30_000);
        assert!(result.is_negative());
    }

    #[test]
    fn apply_entry_rejects_both_sides_positive() {
        let balance = Money::new(50_000).unwrap();
        let one = Money::new(1).unwrap();
        assert!(apply_entry(balance, one, one, false).is_err());
    }

    #[test]
    fn lock_order_is_stable_regardless_of_call_order() {
        let low = Uuid::from_u128(1);
        let high = Uuid::from_u128(2);
        assert_eq!(lock_order(low, high), lock_order(high, low));
    }
}
