//! Funds — the multi-fund ledger's accounts.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundType {
    General,
    Restricted,
    Designated,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fund {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub fund_type: FundType,
    /// Cached aggregate over the transaction log; authoritative for
    /// reads but derivable by replay.
    pub current_balance: Money,
    pub active: bool,
}

/// Canonical fund codes seeded at bootstrap. Designated funds
/// beyond `FONDO_GENERAL`/`FONDO_NACIONAL` map one-to-one onto the
/// `designated` income fields on `Report`.
pub mod codes {
    pub const FONDO_GENERAL: &str = "FONDO_GENERAL";
    pub const FONDO_NACIONAL: &str = "FONDO_NACIONAL";
    pub const MISIONES: &str = "MISIONES";
    pub const LAZOS_AMOR: &str = "LAZOS_AMOR";
    pub const MISION_POSIBLE: &str = "MISION_POSIBLE";
    pub const APY: &str = "APY";
    pub const IBA: &str = "IBA";
    pub const CABALLEROS: &str = "CABALLEROS";
    pub const DAMAS: &str = "DAMAS";
    pub const JOVENES: &str = "JOVENES";
    pub const NINOS: &str = "NINOS";

    /// The designated-fund codes that appear as fields on
    /// `Report::designated` and so take part in the ledger package a
    /// report approval posts (approval step 3), in the order those
    /// fields are declared above.
    pub const DESIGNATED: [&str; 6] = [
        MISIONES,
        LAZOS_AMOR,
        MISION_POSIBLE,
        APY,
        IBA,
        CABALLEROS,
    ];

    /// Every designated fund in the seeded set ("designated
    /// funds `{Misiones, Lazos de Amor, Mision Posible, APY, IBA,
    /// Caballeros, Damas, Jovenes, Niños}`"). `Damas`/`Jovenes`/`Niños`
    /// are ledger accounts an event's `fund_id` can target even though
    /// they have no corresponding field on `Report::designated` — a
    /// congregation's youth or children's ministry raises and spends
    /// against its own fund through the Event Budget Engine (C5)
    /// rather than through the monthly report.
    pub const ALL_DESIGNATED: [&str; 9] = [
        MISIONES,
        LAZOS_AMOR,
        MISION_POSIBLE,
        APY,
        IBA,
        CABALLEROS,
        DAMAS,
        JOVENES,
        NINOS,
    ];
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFundInput {
    pub name: String,
    pub code: String,
    pub fund_type: FundType,
}
