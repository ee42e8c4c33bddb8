use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{IdpConfigStore, StoreResult, check_record};
use crate::models::IdpConfig;

/// In-memory store using DashMap for concurrent access.
///
/// Records live only as long as the process. Each node in a multi-node
/// deployment would hold its own independent copy; use the SQLite store when
/// records must survive restarts.
#[derive(Clone, Default)]
pub struct MemoryIdpConfigStore {
    records: Arc<DashMap<String, IdpConfig>>,
}

impl MemoryIdpConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdpConfigStore for MemoryIdpConfigStore {
    async fn get(&self, idp_id: &str) -> StoreResult<Option<IdpConfig>> {
        Ok(self.records.get(idp_id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, idp_id: &str, config: IdpConfig) -> StoreResult<()> {
        check_record(idp_id, &config)?;
        self.records.insert(idp_id.to_string(), config);
        Ok(())
    }

    async fn delete(&self, idp_id: &str) -> StoreResult<()> {
        self.records.remove(idp_id);
        Ok(())
    }

    async fn list(&self) -> StoreResult<Vec<IdpConfig>> {
        let mut configs: Vec<IdpConfig> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        configs.sort_by(|a, b| a.idp_id.cmp(&b.idp_id));
        Ok(configs)
    }
}
