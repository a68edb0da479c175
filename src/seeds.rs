//! Bootstrap data: the church list, the fund
//! set, and the two special providers. Idempotent — re-running against
//! an already-seeded store is a no-op, so the admin CLI's `seed`
//! subcommand is safe to invoke on every deploy.

use std::sync::Arc;

use crate::churches::ChurchStore;
use crate::domain::fund::codes;
use crate::domain::{
    CreateChurchInput, CreateFundInput, CreateProviderInput, FundType, ProviderCategory,
    ProviderContact, ProviderIdKind,
};
use crate::domain::provider::seed as provider_seed;
use crate::error::Result;
use crate::ledger::FundLedger;
use crate::providers::ProviderStore;

/// The ~22 local congregations. City and contact details are
/// placeholders an operator overwrites through the church-admin
/// surface; what matters for bootstrapping is that every name in this
/// list gets a stable `Church` row before the first report can
/// reference it.
pub const CHURCH_NAMES: [&str; 22] = [
    "IPU Asunción - Templo Central",
    "IPU San Lorenzo",
    "IPU Luque",
    "IPU Capiatá",
    "IPU Lambaré",
    "IPU Fernando de la Mora",
    "IPU Ñemby",
    "IPU Villa Elisa",
    "IPU Itauguá",
    "IPU Mariano Roque Alonso",
    "IPU Limpio",
    "IPU Ypané",
    "IPU Aregua",
    "IPU Ciudad del Este",
    "IPU Encarnación",
    "IPU Coronel Oviedo",
    "IPU Caaguazú",
    "IPU Pilar",
    "IPU Concepción",
    "IPU Villarrica",
    "IPU Caacupé",
    "IPU San Pedro",
];

/// Seeds the ~22 churches, skipping any name already present.
pub async fn seed_churches(store: &Arc<dyn ChurchStore>) -> Result<usize> {
    let mut created = 0;
    for name in CHURCH_NAMES {
        if store.find_by_name(name).await?.is_some() {
            continue;
        }
        store
            .create(CreateChurchInput {
                name: name.to_string(),
                city: "Paraguay".to_string(),
                primary_pastor_name: "Por asignar".to_string(),
                contact_phone: "".to_string(),
                contact_email: "".to_string(),
                tax_id: None,
            })
            .await?;
        created += 1;
    }
    Ok(created)
}

async fn ensure_fund(
    ledger: &Arc<dyn FundLedger>,
    code: &str,
    name: &str,
    fund_type: FundType,
) -> Result<bool> {
    if ledger.find_fund_by_code(code).await?.is_some() {
        return Ok(false);
    }
    ledger
        .create_fund(CreateFundInput {
            name: name.to_string(),
            code: code.to_string(),
            fund_type,
        })
        .await?;
    Ok(true)
}

/// Seeds `Fondo General`, `Fondo Nacional`, and the nine designated
/// funds , skipping any code already present.
pub async fn seed_funds(ledger: &Arc<dyn FundLedger>) -> Result<usize> {
    let mut created = 0;
    if ensure_fund(ledger, codes::FONDO_GENERAL, "Fondo General", FundType::General).await? {
        created += 1;
    }
    if ensure_fund(ledger, codes::FONDO_NACIONAL, "Fondo Nacional", FundType::Restricted).await? {
        created += 1;
    }
    for code in codes::ALL_DESIGNATED {
        if ensure_fund(ledger, code, code, FundType::Designated).await? {
            created += 1;
        }
    }
    Ok(created)
}

/// Seeds the two special providers (electricity, water) whose
/// non-standard identifier kinds the Report Engine auto-suggests on
/// matching expense concepts.
pub async fn seed_special_providers(store: &Arc<dyn ProviderStore>) -> Result<usize> {
    let mut created = 0;

    if store
        .find_by_tax_id(provider_seed::ELECTRICITY_TAX_ID)
        .await?
        .is_none()
    {
        store
            .create(CreateProviderInput {
                tax_id: provider_seed::ELECTRICITY_TAX_ID.to_string(),
                id_kind: ProviderIdKind::Nis,
                display_name: provider_seed::ELECTRICITY_DISPLAY_NAME.to_string(),
                legal_name: None,
                category: ProviderCategory::Utilities,
                contact: ProviderContact {
                    phone: None,
                    email: None,
                    address: None,
                },
            })
            .await?;
        created += 1;
    }

    if store.find_by_tax_id(provider_seed::WATER_TAX_ID).await?.is_none() {
        store
            .create(CreateProviderInput {
                tax_id: provider_seed::WATER_TAX_ID.to_string(),
                id_kind: ProviderIdKind::Issan,
                display_name: provider_seed::WATER_DISPLAY_NAME.to_string(),
                legal_name: None,
                category: ProviderCategory::Utilities,
                contact: ProviderContact {
                    phone: None,
                    email: None,
                    address: None,
                },
            })
            .await?;
        created += 1;
    }

    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::churches::InMemoryChurchStore;
    use crate::ledger::InMemoryFundLedger;
    use crate::providers::InMemoryProviderStore;

    #[tokio::test]
    async fn seed_churches_is_idempotent() {
        let store: Arc<dyn ChurchStore> = Arc::new(InMemoryChurchStore::new());
        let first = seed_churches(&store).await.unwrap();
        assert_eq!(first, CHURCH_NAMES.len());
        let second = seed_churches(&store).await.unwrap();
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn seed_funds_creates_general_national_and_nine_designated() {
        let ledger: Arc<dyn FundLedger> = Arc::new(InMemoryFundLedger::new());
        let created = seed_funds(&ledger).await.unwrap();
        assert_eq!(created, 2 + codes::ALL_DESIGNATED.len());
        assert_eq!(seed_funds(&ledger).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn seed_special_providers_is_idempotent() {
        let store: Arc<dyn ProviderStore> = Arc::new(InMemoryProviderStore::new());
        let created = seed_special_providers(&store).await.unwrap();
        assert_eq!(created, 2);
        assert_eq!(seed_special_providers(&store).await.unwrap(), 0);
    }
}
