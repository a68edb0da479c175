//! Provider Registry (C3).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CreateProviderInput, Provider, ProviderCategory, UpdateProviderInput};
use crate::error::Result;

pub use memory::InMemoryProviderStore;
pub use postgres::PgProviderStore;

#[derive(Debug, Clone, Default)]
pub struct ProviderSearchQuery {
    pub query: String,
    pub category: Option<ProviderCategory>,
    pub limit: i64,
}

impl ProviderSearchQuery {
    pub fn new(query: impl Into<String>) -> ProviderSearchQuery {
        ProviderSearchQuery {
            query: query.into(),
            category: None,
            limit: 20,
        }
    }
}

/// Returned when `create` finds a pre-existing row with the same
/// `tax_id` ("Insert with an existing tax_id returns
/// Conflict and includes the existing row").
#[derive(Debug, Clone)]
pub struct ProviderConflict {
    pub existing: Provider,
}

#[async_trait]
pub trait ProviderStore: Send + Sync {
    async fn create(&self, input: CreateProviderInput) -> Result<std::result::Result<Provider, ProviderConflict>>;
    async fn update(&self, id: Uuid, input: UpdateProviderInput) -> Result<Provider>;
    async fn deactivate(&self, id: Uuid) -> Result<Provider>;
    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<Provider>>;
    async fn search(&self, query: ProviderSearchQuery) -> Result<Vec<Provider>>;
}

/// Match-quality tiers used to rank `search` results (:
/// "ordered by match quality then display name"). Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum MatchQuality {
    TaxIdExact,
    DisplayNamePrefix,
    LegalNamePrefix,
    DisplayNameInfix,
    LegalNameInfix,
    TaxIdInfix,
    NoMatch,
}

/// Scores a candidate provider against a case-insensitive query,
/// shared by both backends so ranking is defined exactly once. Returns
/// `None` when nothing matches.
pub(crate) fn score_match(
    query_lower: &str,
    display_name: &str,
    legal_name: Option<&str>,
    tax_id: &str,
) -> Option<MatchQuality> {
    if query_lower.is_empty() {
        return Some(MatchQuality::NoMatch);
    }
    let display_lower = display_name.to_lowercase();
    let tax_id_lower = tax_id.to_lowercase();
    let legal_lower = legal_name.map(|n| n.to_lowercase());

    if tax_id_lower == query_lower {
        return Some(MatchQuality::TaxIdExact);
    }
    if display_lower.starts_with(query_lower) {
        return Some(MatchQuality::DisplayNamePrefix);
    }
    if let Some(legal) = &legal_lower {
        if legal.starts_with(query_lower) {
            return Some(MatchQuality::LegalNamePrefix);
        }
    }
    if display_lower.contains(query_lower) {
        return Some(MatchQuality::DisplayNameInfix);
    }
    if let Some(legal) = &legal_lower {
        if legal.contains(query_lower) {
            return Some(MatchQuality::LegalNameInfix);
        }
    }
    if tax_id_lower.contains(query_lower) {
        return Some(MatchQuality::TaxIdInfix);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_tax_id_outranks_prefix_match() {
        let exact = score_match("acme", "Other Co", None, "ACME").unwrap();
        let prefix = score_match("acme", "Acme Supplies", None, "999").unwrap();
        assert!(exact < prefix);
    }

    #[test]
    fn no_match_returns_none() {
        assert!(score_match("zzz", "Acme Supplies", None, "999").is_none());
    }

    #[test]
    fn infix_match_on_legal_name() {
        let quality = score_match("electrica", "CEN", Some("Compania Electrica Nacional"), "NIS-1")
            .unwrap();
        assert_eq!(quality, MatchQuality::LegalNameInfix);
    }
}
