//! Report Engine (C4).
//!
//! Pure functions for derived-field computation and the status
//! transition table live here, free of any store; [`engine::ReportEngine`]
//! is the transactional shell that invokes them and folds in the
//! Authorization Kernel, Fund Ledger, and Audit Sink.

pub mod engine;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{DonorInput, Report, ReportDerived, ReportDonor, ReportInput, ReportStatus};
use crate::error::{CoreError, Result};
use crate::money::{tithe, Money};

pub use engine::ReportEngine;
pub use memory::InMemoryReportStore;
pub use postgres::PgReportStore;

/// Recomputes every derived field from the trusted inputs. Called
/// on every write and never supplied by the client — derived values
/// live in a separate record rebuilt on each write.
pub fn compute_derived(input: &ReportInput) -> ReportDerived {
    let fondo_nacional = tithe(input.income.diezmos);
    let designated_total = input.designated.total();
    let total_fondo_nacional = fondo_nacional + designated_total;
    let total_entradas = input.income.total() + designated_total;
    let gastos_operativos = input.expenses.gastos_operativos();
    let total_salidas = (gastos_operativos
        + input.expenses.honorarios_pastoral
        + fondo_nacional
        + designated_total)
        .as_i64();

    ReportDerived {
        fondo_nacional,
        total_fondo_nacional,
        total_entradas,
        gastos_operativos,
        total_salidas: Money::from_raw(total_salidas),
        saldo_mes: total_entradas.as_i64() - total_salidas,
    }
}

/// Validates donor reconciliation ("If `income.diezmos > 0`,
/// the submit transition requires at least one `ReportDonor` with
/// positive `amount`, and `|Σ donor.amount − income.diezmos| ≤ 1`").
pub fn validate_donor_reconciliation(diezmos: Money, donors: &[DonorInput]) -> Result<()> {
    if diezmos.is_zero() {
        return Ok(());
    }
    let positive_donors: Vec<&DonorInput> = donors.iter().filter(|d| !d.amount.is_zero()).collect();
    if positive_donors.is_empty() {
        return Err(CoreError::DonorMismatch {
            donor_total: 0,
            diezmos: diezmos.as_i64(),
        });
    }
    let donor_total: Money = positive_donors.iter().map(|d| d.amount).sum();
    let delta = (donor_total.as_i64() - diezmos.as_i64()).abs();
    if delta > 1 {
        return Err(CoreError::DonorMismatch {
            donor_total: donor_total.as_i64(),
            diezmos: diezmos.as_i64(),
        });
    }
    Ok(())
}

/// On `submit`, `|deposit.amount − total_fondo_nacional| ≤ 100` is
/// checked and recorded as a warning, not blocking unless the policy
/// flag `strict_deposit` is on. Returns `Ok(Some(delta))` when
/// the deposit is out of tolerance (a warning to surface to the
/// caller), `Ok(None)` when it reconciles, `Err` only when
/// `strict_deposit` promotes the mismatch to a blocking error.
pub fn check_deposit_reconciliation(
    deposit_amount: Money,
    total_fondo_nacional: Money,
    strict: bool,
) -> Result<Option<i64>> {
    let delta = deposit_amount.as_i64() - total_fondo_nacional.as_i64();
    if delta.abs() <= 100 {
        return Ok(None);
    }
    if strict {
        return Err(CoreError::DomainRangeError(format!(
            "deposit amount {} does not reconcile with total_fondo_nacional {} (delta {delta})",
            deposit_amount.as_i64(),
            total_fondo_nacional.as_i64()
        )));
    }
    Ok(Some(delta))
}

/// The action half of `(status, action, principal) -> Result<status>`.
/// The principal-level gating itself is the Authorization Kernel's
/// job; this function only knows what moves are legal from what state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAction {
    Submit,
    RequestRevision,
    Approve,
    Reject,
    RollbackToRevision,
}

pub fn next_status(current: ReportStatus, action: ReportAction) -> Result<ReportStatus> {
    use ReportAction::*;
    use ReportStatus::*;
    let result = match (current, action) {
        (Draft, Submit) => Submitted,
        (PendingRevision, Submit) => Submitted,
        (Submitted, RequestRevision) => PendingRevision,
        (Submitted, Approve) => Approved,
        (Submitted, Reject) => Rejected,
        (PendingRevision, Reject) => Rejected,
        (Approved, RollbackToRevision) => PendingRevision,
        _ => {
            return Err(CoreError::InvalidTransition {
                from: format!("{current:?}"),
                action: format!("{action:?}"),
            })
        }
    };
    Ok(result)
}

pub fn is_editable(status: ReportStatus) -> bool {
    matches!(status, ReportStatus::Draft | ReportStatus::PendingRevision)
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Creates a new draft report with its donor set, enforcing the
    /// `(church_id, month, year)` uniqueness invariant.
    async fn create(&self, input: ReportInput) -> Result<Report>;

    /// Replaces a draft/pending-revision report's inputs and donor set
    /// wholesale ("Donors are replaced wholesale on each
    /// edit: old set deleted, new set inserted, in one transaction"),
    /// recomputing derived fields.
    async fn replace_inputs(&self, id: Uuid, input: ReportInput) -> Result<Report>;

    async fn find(&self, id: Uuid) -> Result<Option<Report>>;
    async fn find_by_natural_key(&self, church_id: Uuid, month: u32, year: i32) -> Result<Option<Report>>;
    async fn list_donors(&self, report_id: Uuid) -> Result<Vec<ReportDonor>>;
    async fn list_for_church(&self, church_id: Uuid) -> Result<Vec<Report>>;

    /// Pure status/attachment bookkeeping mutation, used by the engine
    /// once the ledger side effects (if any) have already succeeded.
    async fn set_status(&self, id: Uuid, status: ReportStatus) -> Result<Report>;

    async fn mark_submitted(&self, id: Uuid, submitted_by: Uuid) -> Result<Report>;
    async fn mark_processed(&self, id: Uuid, processed_by: Uuid) -> Result<Report>;
    async fn clear_processing(&self, id: Uuid) -> Result<Report>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ReportDesignated, ReportExpenses, ReportIncome};

    fn report_input(diezmos: i64, ofrendas: i64) -> ReportInput {
        ReportInput {
            church_id: Uuid::new_v4(),
            month: 3,
            year: 2025,
            income: ReportIncome {
                diezmos: Money::new(diezmos).unwrap(),
                ofrendas: Money::new(ofrendas).unwrap(),
                ..Default::default()
            },
            designated: ReportDesignated::default(),
            expenses: ReportExpenses::default(),
            deposit: Default::default(),
            attendance: Default::default(),
            observations: None,
            donors: vec![],
        }
    }

    #[test]
    fn scenario_1_derived_fields_match_literal_values() {
        let input = report_input(1_000_000, 500_000);
        let derived = compute_derived(&input);
        assert_eq!(derived.fondo_nacional.as_i64(), 100_000);
        assert_eq!(derived.total_entradas.as_i64(), 1_500_000);
    }

    #[test]
    fn saldo_mes_can_go_negative() {
        let mut input = report_input(0, 100);
        input.expenses.energia = Money::new(5_000).unwrap();
        let derived = compute_derived(&input);
        assert!(derived.saldo_mes < 0);
    }

    #[test]
    fn donor_mismatch_rejected_when_outside_tolerance() {
        let diezmos = Money::new(1_000_000).unwrap();
        let donors = vec![DonorInput {
            first_name: "Ana".to_string(),
            last_name: "Perez".to_string(),
            document: Some("1234".to_string()),
            amount: Money::new(900_000).unwrap(),
        }];
        assert!(validate_donor_reconciliation(diezmos, &donors).is_err());
    }

    #[test]
    fn donor_reconciliation_allows_one_unit_tolerance() {
        let diezmos = Money::new(1_000_000).unwrap();
        let donors = vec![DonorInput {
            first_name: "Ana".to_string(),
            last_name: "Perez".to_string(),
            document: None,
            amount: Money::new(999_999).unwrap(),
        }];
        assert!(validate_donor_reconciliation(diezmos, &donors).is_ok());
    }

    #[test]
    fn zero_diezmos_requires_no_donors() {
        assert!(validate_donor_reconciliation(Money::ZERO, &[]).is_ok());
    }

    #[test]
    fn legal_transitions_per_state_machine() {
        assert_eq!(
            next_status(ReportStatus::Draft, ReportAction::Submit).unwrap(),
            ReportStatus::Submitted
        );
        assert_eq!(
            next_status(ReportStatus::Submitted, ReportAction::Approve).unwrap(),
            ReportStatus::Approved
        );
        assert_eq!(
            next_status(ReportStatus::Approved, ReportAction::RollbackToRevision).unwrap(),
            ReportStatus::PendingRevision
        );
        assert!(next_status(ReportStatus::Rejected, ReportAction::Submit).is_err());
        assert!(next_status(ReportStatus::Draft, ReportAction::Approve).is_err());
    }

    #[test]
    fn deposit_reconciliation_warns_but_does_not_block_by_default() {
        let deposit = Money::new(100_300).unwrap();
        let expected = Money::new(100_000).unwrap();
        let warning = check_deposit_reconciliation(deposit, expected, false).unwrap();
        assert_eq!(warning, Some(300));
    }

    #[test]
    fn deposit_reconciliation_blocks_under_strict_policy() {
        let deposit = Money::new(100_300).unwrap();
        let expected = Money::new(100_000).unwrap();
        assert!(check_deposit_reconciliation(deposit, expected, true).is_err());
    }
}
