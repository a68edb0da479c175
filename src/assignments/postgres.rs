//! PostgreSQL-backed `AssignmentStore`.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::{CreateAssignmentInput, FundDirectorAssignment};
use crate::error::Result;

use super::AssignmentStore;

pub struct PgAssignmentStore {
    pool: PgPool,
}

impl PgAssignmentStore {
    pub fn new(pool: PgPool) -> PgAssignmentStore {
        PgAssignmentStore { pool }
    }
}

fn row_to_assignment(row: sqlx::postgres::PgRow) -> FundDirectorAssignment {
    FundDirectorAssignment {
        principal_id: row.get("principal_id"),
        fund_id: row.get("fund_id"),
        church_scope: row.get("church_scope"),
    }
}

#[async_trait]
impl AssignmentStore for PgAssignmentStore {
    async fn create(&self, input: CreateAssignmentInput) -> Result<FundDirectorAssignment> {
        sqlx::query(
            "INSERT INTO fund_director_assignments (id, principal_id, fund_id, church_scope) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(Uuid::new_v4())
        .bind(input.principal_id)
        .bind(input.fund_id)
        .bind(input.church_scope)
        .execute(&self.pool)
        .await?;
        Ok(FundDirectorAssignment {
            principal_id: input.principal_id,
            fund_id: input.fund_id,
            church_scope: input.church_scope,
        })
    }

    async fn list_for_principal(&self, principal_id: Uuid) -> Result<Vec<FundDirectorAssignment>> {
        let rows = sqlx::query(
            "SELECT principal_id, fund_id, church_scope FROM fund_director_assignments WHERE principal_id = $1",
        )
        .bind(principal_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(row_to_assignment).collect())
    }

    async fn delete(&self, principal_id: Uuid, fund_id: Option<Uuid>, church_scope: Option<Uuid>) -> Result<()> {
        sqlx::query(
            "DELETE FROM fund_director_assignments WHERE principal_id = $1 \
             AND fund_id IS NOT DISTINCT FROM $2 AND church_scope IS NOT DISTINCT FROM $3",
        )
        .bind(principal_id)
        .bind(fund_id)
        .bind(church_scope)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
