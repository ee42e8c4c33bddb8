//! Persistence for IdP binding records.
//!
//! One record per IdP identifier. Writes are full-record replacements and are
//! atomic per key; concurrent writers to the same key resolve as last writer
//! wins.

mod error;
mod memory;
#[cfg(feature = "database-sqlite")]
mod sqlite;

use async_trait::async_trait;
pub use error::*;
pub use memory::MemoryIdpConfigStore;
#[cfg(feature = "database-sqlite")]
pub use sqlite::SqliteIdpConfigStore;
use validator::Validate;

use crate::models::IdpConfig;

/// Store of IdP binding records keyed by IdP identifier.
#[async_trait]
pub trait IdpConfigStore: Send + Sync {
    /// Get the record for an IdP.
    async fn get(&self, idp_id: &str) -> StoreResult<Option<IdpConfig>>;

    /// Replace the record for an IdP.
    ///
    /// Readers see either the previous record or the new one, never a mix.
    ///
    /// # Errors
    /// `Conflict` if `config.idp_id` differs from `idp_id`; `Invalid` if the
    /// record breaks a field invariant.
    async fn put(&self, idp_id: &str, config: IdpConfig) -> StoreResult<()>;

    /// Remove the record for an IdP. Removing a missing record succeeds.
    async fn delete(&self, idp_id: &str) -> StoreResult<()>;

    /// All records, ordered by IdP identifier.
    async fn list(&self) -> StoreResult<Vec<IdpConfig>>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Build the store selected in configuration.
#[cfg(feature = "server")]
pub async fn from_config(
    config: &crate::config::StoreConfig,
) -> StoreResult<std::sync::Arc<dyn IdpConfigStore>> {
    use std::sync::Arc;

    use crate::config::StoreConfig;

    match config {
        StoreConfig::Memory => {
            tracing::info!("Using in-memory IdP configuration store");
            Ok(Arc::new(MemoryIdpConfigStore::new()))
        }
        #[cfg(feature = "database-sqlite")]
        StoreConfig::Sqlite(sqlite) => {
            tracing::info!(path = %sqlite.path, "Using SQLite IdP configuration store");
            Ok(Arc::new(SqliteIdpConfigStore::from_config(sqlite).await?))
        }
    }
}

/// Checks shared by every backend before a write.
pub(crate) fn check_record(idp_id: &str, config: &IdpConfig) -> StoreResult<()> {
    if config.idp_id != idp_id {
        return Err(StoreError::Conflict(format!(
            "record identifier '{}' does not match key '{}'",
            config.idp_id, idp_id
        )));
    }
    config
        .validate()
        .map_err(|e| StoreError::Invalid(e.to_string()))
}
