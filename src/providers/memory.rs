//! In-memory `ProviderStore` fake used by contract tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CreateProviderInput, Provider, UpdateProviderInput};
use crate::error::Result;

use super::{score_match, ProviderConflict, ProviderSearchQuery, ProviderStore};

#[derive(Default)]
pub struct InMemoryProviderStore {
    rows: Mutex<HashMap<Uuid, Provider>>,
}

impl InMemoryProviderStore {
    pub fn new() -> InMemoryProviderStore {
        InMemoryProviderStore::default()
    }
}

#[async_trait]
impl ProviderStore for InMemoryProviderStore {
    async fn create(
        &self,
        input: CreateProviderInput,
    ) -> Result<std::result::Result<Provider, ProviderConflict>> {
        let mut rows = self.rows.lock().expect("provider store mutex poisoned");
        if let Some(existing) = rows.values().find(|p| p.tax_id == input.tax_id) {
            return Ok(Err(ProviderConflict {
                existing: existing.clone(),
            }));
        }
        let provider = Provider {
            id: Uuid::new_v4(),
            tax_id: input.tax_id,
            id_kind: input.id_kind,
            display_name: input.display_name,
            legal_name: input.legal_name,
            category: input.category,
            special: false,
            active: true,
            contact: input.contact,
        };
        rows.insert(provider.id, provider.clone());
        Ok(Ok(provider))
    }

    async fn update(&self, id: Uuid, input: UpdateProviderInput) -> Result<Provider> {
        let mut rows = self.rows.lock().expect("provider store mutex poisoned");
        let provider = rows.get_mut(&id).ok_or_else(|| crate::error::CoreError::NotFound {
            kind: "Provider".to_string(),
            id: id.to_string(),
        })?;
        if let Some(display_name) = input.display_name {
            provider.display_name = display_name;
        }
        if let Some(legal_name) = input.legal_name {
            provider.legal_name = Some(legal_name);
        }
        if let Some(category) = input.category {
            provider.category = category;
        }
        if let Some(contact) = input.contact {
            provider.contact = contact;
        }
        Ok(provider.clone())
    }

    async fn deactivate(&self, id: Uuid) -> Result<Provider> {
        let mut rows = self.rows.lock().expect("provider store mutex poisoned");
        let provider = rows.get_mut(&id).ok_or_else(|| crate::error::CoreError::NotFound {
            kind: "Provider".to_string(),
            id: id.to_string(),
        })?;
        provider.active = false;
        Ok(provider.clone())
    }

    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<Provider>> {
        let rows = self.rows.lock().expect("provider store mutex poisoned");
        Ok(rows.values().find(|p| p.tax_id == tax_id).cloned())
    }

    async fn search(&self, query: ProviderSearchQuery) -> Result<Vec<Provider>> {
        let rows = self.rows.lock().expect("provider store mutex poisoned");
        let query_lower = query.query.to_lowercase();
        let mut scored: Vec<(super::MatchQuality, Provider)> = rows
            .values()
            .filter(|p| p.active)
            .filter(|p| query.category.map_or(true, |c| c == p.category))
            .filter_map(|p| {
                score_match(&query_lower, &p.display_name, p.legal_name.as_deref(), &p.tax_id)
                    .map(|quality| (quality, p.clone()))
            })
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.display_name.cmp(&b.1.display_name)));
        let limit = if query.limit <= 0 { 20 } else { query.limit as usize };
        Ok(scored.into_iter().take(limit).map(|(_, p)| p).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProviderCategory, ProviderContact, ProviderIdKind};

    fn input(tax_id: &str, name: &str) -> CreateProviderInput {
        CreateProviderInput {
            tax_id: tax_id.to_string(),
            id_kind: ProviderIdKind::Ruc,
            display_name: name.to_string(),
            legal_name: None,
            category: ProviderCategory::Supplies,
            contact: ProviderContact {
                phone: None,
                email: None,
                address: None,
            },
        }
    }

    #[tokio::test]
    async fn duplicate_tax_id_returns_conflict_with_existing_row() {
        let store = InMemoryProviderStore::new();
        let first = store.create(input("RUC-1", "Acme")).await.unwrap().unwrap();
        let conflict = store
            .create(input("RUC-1", "Acme Duplicate"))
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(conflict.existing.id, first.id);
    }

    #[tokio::test]
    async fn update_cannot_touch_tax_id() {
        let store = InMemoryProviderStore::new();
        let provider = store.create(input("RUC-2", "Acme")).await.unwrap().unwrap();
        let updated = store
            .update(
                provider.id,
                UpdateProviderInput {
                    display_name: Some("Acme Renamed".to_string()),
                    legal_name: None,
                    category: None,
                    contact: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.tax_id, "RUC-2");
        assert_eq!(updated.display_name, "Acme Renamed");
    }

    #[tokio::test]
    async fn search_excludes_inactive_providers() {
        let store = InMemoryProviderStore::new();
        let provider = store.create(input("RUC-3", "Acme Supplies")).await.unwrap().unwrap();
        store.deactivate(provider.id).await.unwrap();
        let results = store.search(ProviderSearchQuery::new("acme")).await.unwrap();
        assert!(results.is_empty());
    }
}
