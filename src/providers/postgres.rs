//! PostgreSQL-backed `ProviderStore`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{
    CreateProviderInput, Provider, ProviderCategory, ProviderContact, ProviderIdKind,
    UpdateProviderInput,
};
use crate::error::{CoreError, Result};

use super::{score_match, ProviderConflict, ProviderSearchQuery, ProviderStore};

pub struct PgProviderStore {
    pool: PgPool,
}

impl PgProviderStore {
    pub fn new(pool: PgPool) -> PgProviderStore {
        PgProviderStore { pool }
    }
}

fn category_str(category: ProviderCategory) -> &'static str {
    match category {
        ProviderCategory::Utilities => "utilities",
        ProviderCategory::ProfessionalFees => "professional_fees",
        ProviderCategory::Supplies => "supplies",
        ProviderCategory::Construction => "construction",
        ProviderCategory::Other => "other",
    }
}

fn parse_category(s: &str) -> ProviderCategory {
    match s {
        "utilities" => ProviderCategory::Utilities,
        "professional_fees" => ProviderCategory::ProfessionalFees,
        "supplies" => ProviderCategory::Supplies,
        "construction" => ProviderCategory::Construction,
        _ => ProviderCategory::Other,
    }
}

fn id_kind_str(kind: ProviderIdKind) -> &'static str {
    match kind {
        ProviderIdKind::Ruc => "ruc",
        ProviderIdKind::Nis => "nis",
        ProviderIdKind::Issan => "issan",
        ProviderIdKind::Ci => "ci",
    }
}

fn parse_id_kind(s: &str) -> ProviderIdKind {
    match s {
        "nis" => ProviderIdKind::Nis,
        "issan" => ProviderIdKind::Issan,
        "ci" => ProviderIdKind::Ci,
        _ => ProviderIdKind::Ruc,
    }
}

fn row_to_provider(row: sqlx::postgres::PgRow) -> Provider {
    Provider {
        id: row.get("id"),
        tax_id: row.get("tax_id"),
        id_kind: parse_id_kind(row.get::<String, _>("id_kind").as_str()),
        display_name: row.get("display_name"),
        legal_name: row.get("legal_name"),
        category: parse_category(row.get::<String, _>("category").as_str()),
        special: row.get("special"),
        active: row.get("active"),
        contact: ProviderContact {
            phone: row.get("contact_phone"),
            email: row.get("contact_email"),
            address: row.get("contact_address"),
        },
    }
}

#[async_trait]
impl ProviderStore for PgProviderStore {
    async fn create(
        &self,
        input: CreateProviderInput,
    ) -> Result<std::result::Result<Provider, ProviderConflict>> {
        if let Some(existing) = self.find_by_tax_id(&input.tax_id).await? {
            return Ok(Err(ProviderConflict { existing }));
        }

        let id = Uuid::new_v4();
        let result = sqlx::query(
            r#"
            INSERT INTO providers
                (id, tax_id, id_kind, display_name, legal_name, category, special, active,
                 contact_phone, contact_email, contact_address)
            VALUES ($1, $2, $3, $4, $5, $6, false, true, $7, $8, $9)
            "#,
        )
        .bind(id)
        .bind(&input.tax_id)
        .bind(id_kind_str(input.id_kind))
        .bind(&input.display_name)
        .bind(&input.legal_name)
        .bind(category_str(input.category))
        .bind(&input.contact.phone)
        .bind(&input.contact.email)
        .bind(&input.contact.address)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(Ok(Provider {
                id,
                tax_id: input.tax_id,
                id_kind: input.id_kind,
                display_name: input.display_name,
                legal_name: input.legal_name,
                category: input.category,
                special: false,
                active: true,
                contact: input.contact,
            })),
            Err(err) => {
                let mapped: CoreError = err.into();
                if matches!(mapped, CoreError::UniqueViolation(_)) {
                    let existing = self.find_by_tax_id(&input.tax_id).await?.ok_or(mapped)?;
                    Ok(Err(ProviderConflict { existing }))
                } else {
                    Err(mapped)
                }
            }
        }
    }

    async fn update(&self, id: Uuid, input: UpdateProviderInput) -> Result<Provider> {
        let current = sqlx::query(
            "SELECT id, tax_id, id_kind, display_name, legal_name, category, special, active, \
             contact_phone, contact_email, contact_address FROM providers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(row_to_provider)
        .ok_or_else(|| CoreError::NotFound {
            kind: "Provider".to_string(),
            id: id.to_string(),
        })?;

        let display_name = input.display_name.unwrap_or(current.display_name);
        let legal_name = input.legal_name.or(current.legal_name);
        let category = input.category.unwrap_or(current.category);
        let contact = input.contact.unwrap_or(current.contact);

        sqlx::query(
            "UPDATE providers SET display_name = $1, legal_name = $2, category = $3, \
             contact_phone = $4, contact_email = $5, contact_address = $6 WHERE id = $7",
        )
        .bind(&display_name)
        .bind(&legal_name)
        .bind(category_str(category))
        .bind(&contact.phone)
        .bind(&contact.email)
        .bind(&contact.address)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(Provider {
            id,
            tax_id: current.tax_id,
            id_kind: current.id_kind,
            display_name,
            legal_name,
            category,
            special: current.special,
            active: current.active,
            contact,
        })
    }

    async fn deactivate(&self, id: Uuid) -> Result<Provider> {
        let row = sqlx::query(
            "UPDATE providers SET active = false WHERE id = $1 RETURNING id, tax_id, id_kind, \
             display_name, legal_name, category, special, active, contact_phone, contact_email, \
             contact_address",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            kind: "Provider".to_string(),
            id: id.to_string(),
        })?;
        Ok(row_to_provider(row))
    }

    async fn find_by_tax_id(&self, tax_id: &str) -> Result<Option<Provider>> {
        let row = sqlx::query(
            "SELECT id, tax_id, id_kind, display_name, legal_name, category, special, active, \
             contact_phone, contact_email, contact_address FROM providers WHERE tax_id = $1",
        )
        .bind(tax_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(row_to_provider))
    }

    async fn search(&self, query: ProviderSearchQuery) -> Result<Vec<Provider>> {
        // Bounded scan, scored in-process (not a full-text
        // index at this scale); the SQL narrows to `active` rows whose
        // tax_id/display_name/legal_name case-insensitively contain the
        // query so the in-process pass only ranks a small candidate set.
        let like_pattern = format!("%{}%", query.query);
        let mut qb = sqlx::QueryBuilder::new(
            "SELECT id, tax_id, id_kind, display_name, legal_name, category, special, active, \
             contact_phone, contact_email, contact_address FROM providers \
             WHERE active = true AND (display_name ILIKE ",
        );
        qb.push_bind(like_pattern.clone())
            .push(" OR legal_name ILIKE ")
            .push_bind(like_pattern.clone())
            .push(" OR tax_id ILIKE ")
            .push_bind(like_pattern)
            .push(")");
        if let Some(category) = query.category {
            qb.push(" AND category = ").push_bind(category_str(category));
        }
        qb.push(" LIMIT 200");

        let rows = qb.build().fetch_all(&self.pool).await?;
        let query_lower = query.query.to_lowercase();
        let mut scored: Vec<(super::MatchQuality, Provider)> = rows
            .into_iter()
            .map(row_to_provider)
            .filter_map(|p| {
                score_match(&query_lower, &p.display_name, p.legal_name.as_deref(), &p.tax_id)
                    .map(|quality| (quality, p))
            })
            .collect();
        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.display_name.cmp(&b.1.display_name)));
        let limit = if query.limit <= 0 { 20 } else { query.limit as usize };
        Ok(scored.into_iter().take(limit).map(|(_, p)| p).collect())
    }
}
