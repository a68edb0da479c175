//! Church directory ("Created by admin; immutable for history
//! once referenced by any report"). Not one of the six named
//! components — it is reference data the Report Engine
//! (C4) and authorization scope checks (C1) resolve `church_id`
//! against — but it needs a store like any other entity.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Church, CreateChurchInput};
use crate::error::Result;

pub use memory::InMemoryChurchStore;
pub use postgres::PgChurchStore;

#[async_trait]
pub trait ChurchStore: Send + Sync {
    async fn create(&self, input: CreateChurchInput) -> Result<Church>;
    async fn find(&self, id: Uuid) -> Result<Option<Church>>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Church>>;
    async fn list(&self) -> Result<Vec<Church>>;
}
