//! Monthly report entities (C4).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Draft,
    Submitted,
    PendingRevision,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportIncome {
    pub diezmos: Money,
    pub ofrendas: Money,
    pub anexos: Money,
    pub caballeros: Money,
    pub damas: Money,
    pub jovenes: Money,
    pub ninos: Money,
    pub otros: Money,
}

impl ReportIncome {
    pub fn total(&self) -> Money {
        self.diezmos
            + self.ofrendas
            + self.anexos
            + self.caballeros
            + self.damas
            + self.jovenes
            + self.ninos
            + self.otros
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportDesignated {
    pub misiones: Money,
    pub lazos_amor: Money,
    pub mision_posible: Money,
    pub apy: Money,
    pub iba: Money,
    pub aporte_caballeros: Money,
}

impl ReportDesignated {
    pub fn total(&self) -> Money {
        self.misiones
            + self.lazos_amor
            + self.mision_posible
            + self.apy
            + self.iba
            + self.aporte_caballeros
    }

    /// Non-zero (fund code, amount) pairs, in declaration order, used
    /// to compose the ledger package (approval step 3).
    pub fn nonzero_by_fund_code(&self) -> Vec<(&'static str, Money)> {
        use crate::domain::fund::codes;
        let pairs: [(&'static str, Money); 6] = [
            (codes::MISIONES, self.misiones),
            (codes::LAZOS_AMOR, self.lazos_amor),
            (codes::MISION_POSIBLE, self.mision_posible),
            (codes::APY, self.apy),
            (codes::IBA, self.iba),
            (codes::CABALLEROS, self.aporte_caballeros),
        ];
        pairs.into_iter().filter(|(_, amount)| !amount.is_zero()).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportExpenses {
    pub energia: Money,
    pub agua: Money,
    pub basura: Money,
    pub servicios: Money,
    pub mantenimiento: Money,
    pub materiales: Money,
    pub otros_gastos: Money,
    pub honorarios_pastoral: Money,
}

impl ReportExpenses {
    /// `gastos_operativos` — everything except pastoral
    /// honoraria, which is tracked separately.
    pub fn gastos_operativos(&self) -> Money {
        self.energia
            + self.agua
            + self.basura
            + self.servicios
            + self.mantenimiento
            + self.materiales
            + self.otros_gastos
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportDeposit {
    pub number: Option<String>,
    pub date: Option<NaiveDate>,
    pub amount: Money,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportAttendance {
    pub visitors: u32,
    pub baptisms_water: u32,
    pub baptisms_spirit: u32,
}

/// Derived fields, recomputed on every write and never client-writable.
/// Kept as a separate struct from the inputs so
/// `DerivedFieldProvidedByClient` is enforced by the input DTOs simply
/// lacking these fields.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportDerived {
    pub fondo_nacional: Money,
    pub total_fondo_nacional: Money,
    pub total_entradas: Money,
    pub gastos_operativos: Money,
    pub total_salidas: Money,
    /// `total_entradas - total_salidas`. Signed, unlike
    /// every other monetary field in this crate: a church that spends
    /// more than it took in that month produces a negative balance,
    /// and `Money` cannot represent that.
    pub saldo_mes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionType {
    Online,
    Manual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionSource {
    ChurchPortal,
    AdminImport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSubmission {
    pub submission_type: SubmissionType,
    pub source: SubmissionSource,
    pub submitted_by: Uuid,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportProcessing {
    pub processed_by: Option<Uuid>,
    pub processed_at: Option<DateTime<Utc>>,
    pub transactions_posted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportAttachments {
    pub summary: Option<String>,
    pub deposit: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub church_id: Uuid,
    pub month: u32,
    pub year: i32,
    pub status: ReportStatus,
    pub income: ReportIncome,
    pub designated: ReportDesignated,
    pub expenses: ReportExpenses,
    pub deposit: ReportDeposit,
    pub attendance: ReportAttendance,
    pub derived: ReportDerived,
    pub observations: Option<String>,
    pub submission: Option<ReportSubmission>,
    pub processing: ReportProcessing,
    pub attachments: ReportAttachments,
}

impl Report {
    /// `(church_id, month, year)` — unique.
    pub fn natural_key(&self) -> (Uuid, u32, i32) {
        (self.church_id, self.month, self.year)
    }
}

/// Typed input for creating/editing a draft report. Deliberately has
/// no `derived`, `status`, or `processing` fields — any attempt to
/// supply them arrives as an unknown field and is rejected by the
/// transport layer before reaching the core.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportInput {
    pub church_id: Uuid,
    pub month: u32,
    pub year: i32,
    pub income: ReportIncome,
    pub designated: ReportDesignated,
    pub expenses: ReportExpenses,
    pub deposit: ReportDeposit,
    pub attendance: ReportAttendance,
    pub observations: Option<String>,
    pub donors: Vec<DonorInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportDonor {
    pub id: Uuid,
    pub report_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub document: Option<String>,
    pub amount: Money,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DonorInput {
    pub first_name: String,
    pub last_name: String,
    pub document: Option<String>,
    pub amount: Money,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn income_total_sums_all_fields() {
        let income = ReportIncome {
            diezmos: Money::new(1_000_000).unwrap(),
            ofrendas: Money::new(500_000).unwrap(),
            ..Default::default()
        };
        assert_eq!(income.total().as_i64(), 1_500_000);
    }

    #[test]
    fn designated_nonzero_pairs_skip_zero_amounts() {
        let designated = ReportDesignated {
            misiones: Money::new(1_000).unwrap(),
            apy: Money::ZERO,
            ..Default::default()
        };
        let pairs = designated.nonzero_by_fund_code();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, crate::domain::fund::codes::MISIONES);
    }

    #[test]
    fn gastos_operativos_excludes_pastoral_honoraria() {
        let expenses = ReportExpenses {
            energia: Money::new(100).unwrap(),
            honorarios_pastoral: Money::new(9_000).unwrap(),
            ..Default::default()
        };
        assert_eq!(expenses.gastos_operativos().as_i64(), 100);
    }
}
