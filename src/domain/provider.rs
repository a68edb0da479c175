//! Provider registry entities (C3).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderIdKind {
    Ruc,
    Nis,
    Issan,
    Ci,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderCategory {
    Utilities,
    ProfessionalFees,
    Supplies,
    Construction,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderContact {
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: Uuid,
    /// Unique across the active+inactive population.
    pub tax_id: String,
    pub id_kind: ProviderIdKind,
    pub display_name: String,
    pub legal_name: Option<String>,
    pub category: ProviderCategory,
    pub special: bool,
    pub active: bool,
    pub contact: ProviderContact,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProviderInput {
    pub tax_id: String,
    pub id_kind: ProviderIdKind,
    pub display_name: String,
    pub legal_name: Option<String>,
    pub category: ProviderCategory,
    pub contact: ProviderContact,
}

/// Fields updatable on a provider. `tax_id` and `id_kind` are
/// intentionally absent — "Update cannot change `tax_id` or
/// `id_kind`".
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProviderInput {
    pub display_name: Option<String>,
    pub legal_name: Option<String>,
    pub category: Option<ProviderCategory>,
    pub contact: Option<ProviderContact>,
}

/// Well-known expense-concept patterns the Report Engine uses to
/// auto-suggest the two seeded special providers.
pub mod seed {
    pub const ELECTRICITY_TAX_ID: &str = "NIS-0000001";
    pub const ELECTRICITY_DISPLAY_NAME: &str = "Compañía Eléctrica Nacional";
    pub const WATER_TAX_ID: &str = "ISSAN-0000001";
    pub const WATER_DISPLAY_NAME: &str = "Administración Nacional de Aguas";
}
