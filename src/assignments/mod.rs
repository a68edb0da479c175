//! Fund director assignments: the data half of the Authorization
//! Kernel's (C1) `fund_director` scope check. [`authz::authorize`]
//! evaluates the predicate; this store is where the assignment rows
//! it evaluates against actually live.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CreateAssignmentInput, FundDirectorAssignment};
use crate::error::Result;

pub use memory::InMemoryAssignmentStore;
pub use postgres::PgAssignmentStore;

#[async_trait]
pub trait AssignmentStore: Send + Sync {
    /// Enforces the unique-under-null-equality constraint: the exact
    /// `(principal_id, fund_id, church_scope)` triple, nulls compared
    /// as ordinary equality rather than wildcards, must be unique.
    async fn create(&self, input: CreateAssignmentInput) -> Result<FundDirectorAssignment>;

    /// Loads every assignment a principal holds, the slice
    /// [`authz::authorize`] evaluates a `fund_director` action against.
    async fn list_for_principal(&self, principal_id: Uuid) -> Result<Vec<FundDirectorAssignment>>;

    async fn delete(&self, principal_id: Uuid, fund_id: Option<Uuid>, church_scope: Option<Uuid>) -> Result<()>;
}
