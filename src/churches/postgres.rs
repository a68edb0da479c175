//! PostgreSQL-backed `ChurchStore`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{Church, CreateChurchInput};
use crate::error::Result;

use super::ChurchStore;

pub struct PgChurchStore {
    pool: PgPool,
}

impl PgChurchStore {
    pub fn new(pool: PgPool) -> PgChurchStore {
        PgChurchStore { pool }
    }
}

fn row_to_church(row: sqlx::postgres::PgRow) -> Church {
    Church {
        id: row.get("id"),
        name: row.get("name"),
        city: row.get("city"),
        primary_pastor_name: row.get("primary_pastor_name"),
        contact_phone: row.get("contact_phone"),
        contact_email: row.get("contact_email"),
        tax_id: row.get("tax_id"),
        active: row.get("active"),
    }
}

const COLUMNS: &str =
    "id, name, city, primary_pastor_name, contact_phone, contact_email, tax_id, active";

#[async_trait]
impl ChurchStore for PgChurchStore {
    async fn create(&self, input: CreateChurchInput) -> Result<Church> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO churches (id, name, city, primary_pastor_name, contact_phone, \
             contact_email, tax_id, active) VALUES ($1, $2, $3, $4, $5, $6, $7, true)",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.city)
        .bind(&input.primary_pastor_name)
        .bind(&input.contact_phone)
        .bind(&input.contact_email)
        .bind(&input.tax_id)
        .execute(&self.pool)
        .await?;
        Ok(Church {
            id,
            name: input.name,
            city: input.city,
            primary_pastor_name: input.primary_pastor_name,
            contact_phone: input.contact_phone,
            contact_email: input.contact_email,
            tax_id: input.tax_id,
            active: true,
        })
    }

    async fn find(&self, id: Uuid) -> Result<Option<Church>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM churches WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_church))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Church>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM churches WHERE name = $1"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(row_to_church))
    }

    async fn list(&self) -> Result<Vec<Church>> {
        let rows = sqlx::query(&format!("SELECT {COLUMNS} FROM churches ORDER BY name"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(row_to_church).collect())
    }
}
