//! treasury-core — accounting engine for a national church treasury
//! system: monthly financial reports, a multi-fund ledger, event
//! budgets, and provider registries across a national organization and
//! its local congregations.
//!
//! The crate is organized by component rather than by layer: each of
//! `authz`, `ledger`, `reports`, `events`, `providers`, and `audit`
//! owns its domain types' store trait, an in-memory fake for tests,
//! and a PostgreSQL-backed implementation. `domain` holds the shared
//! entity types; `assignments` holds the `fund_director` scope grants
//! the Authorization Kernel evaluates against.

pub mod assignments;
pub mod audit;
pub mod authz;
pub mod blobstore;
pub mod churches;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod ledger;
pub mod money;
pub mod providers;
pub mod reports;
pub mod seeds;

pub use config::CoreConfig;
pub use error::{CoreError, Result};
