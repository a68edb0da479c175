//! Configuration for the treasury core.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Postgres connection settings for the unit-of-work pool.
    pub database: DatabaseConfig,

    /// Policy switches that affect mutation behavior.
    pub policy: PolicyConfig,

    /// Concurrency and deadline settings.
    pub concurrency: ConcurrencyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://...` connection string. Never logged.
    pub url: String,

    /// Maximum pool connections.
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// When true, `report.submit` blocks (rather than warns) if
    /// `|deposit.amount - total_fondo_nacional| > 100`.
    pub strict_deposit: bool,

    /// When true, `report.approve` may flag its Fondo General posting
    /// `allow_overdraw` for book entries already physically received
    /// (open question (b)). Off unless explicitly enabled;
    /// never settable from a request payload.
    pub allow_overdraw: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Maximum `SERIALIZABLE` retry attempts before surfacing
    /// `ConcurrentUpdate` ("bounded retries ... maximum 3").
    pub max_retries: u32,

    /// Per-operation deadline for single-entity mutations, in seconds.
    pub single_entity_deadline_secs: u64,

    /// Per-operation deadline for report/event approvals, in seconds.
    pub approval_deadline_secs: u64,
}

impl CoreConfig {
    /// Loads configuration from a TOML file, falling back to defaults
    /// for any section the file omits.
    pub fn load(path: impl AsRef<Path>) -> Result<CoreConfig> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|_| CoreError::FileNotFound(path.to_path_buf()))?;
        toml::from_str(&contents).map_err(|e| CoreError::Config(e.to_string()))
    }
}

impl ConcurrencyConfig {
    pub fn single_entity_deadline(&self) -> Duration {
        Duration::from_secs(self.single_entity_deadline_secs)
    }

    pub fn approval_deadline(&self) -> Duration {
        Duration::from_secs(self.approval_deadline_secs)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            policy: PolicyConfig::default(),
            concurrency: ConcurrencyConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/treasury".to_string(),
            max_connections: 10,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            strict_deposit: false,
            allow_overdraw: false,
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            single_entity_deadline_secs: 10,
            approval_deadline_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.concurrency.max_retries, 3);
        assert_eq!(cfg.concurrency.single_entity_deadline_secs, 10);
        assert_eq!(cfg.concurrency.approval_deadline_secs, 30);
        assert!(!cfg.policy.allow_overdraw);
        assert!(!cfg.policy.strict_deposit);
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = CoreConfig::load("/nonexistent/path/treasury.toml").unwrap_err();
        assert!(matches!(err, CoreError::FileNotFound(_)));
    }
}
