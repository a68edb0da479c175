//! The append-only fund transaction log (C2).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::money::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundTransaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub fund_id: Uuid,
    pub church_id: Option<Uuid>,
    pub report_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub concept: String,
    pub amount_in: Money,
    pub amount_out: Money,
    /// The fund's running balance immediately after this entry.
    pub balance_after: Money,
    pub related_transaction_id: Option<Uuid>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl FundTransaction {
    /// Enforces "exactly one of `amount_in`/`amount_out` is positive".
    pub fn validate_single_sided(amount_in: Money, amount_out: Money) -> Result<()> {
        let in_positive = !amount_in.is_zero();
        let out_positive = !amount_out.is_zero();
        if in_positive == out_positive {
            return Err(CoreError::InvalidEntry(
                "exactly one of amount_in/amount_out must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The system principal used on rows created by the Report/Event
    /// engines ("created_by = 'system'").
    pub const SYSTEM_ACTOR: &'static str = "system";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_both_zero() {
        assert!(FundTransaction::validate_single_sided(Money::ZERO, Money::ZERO).is_err());
    }

    #[test]
    fn rejects_both_positive() {
        let one = Money::new(1).unwrap();
        assert!(FundTransaction::validate_single_sided(one, one).is_err());
    }

    #[test]
    fn accepts_exactly_one_positive() {
        let one = Money::new(1).unwrap();
        assert!(FundTransaction::validate_single_sided(one, Money::ZERO).is_ok());
        assert!(FundTransaction::validate_single_sided(Money::ZERO, one).is_ok());
    }
}
