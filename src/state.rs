use registrar_config::TransactionConfig;
use registrar_core::AppResult;
use registrar_db::{MemoryStore, Store, StoreTx};
use std::sync::Arc;

/// Shared handle passed to every service operation.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub transactions: TransactionConfig,
}

impl AppState {
    pub fn new(store: impl Store + 'static, transactions: TransactionConfig) -> Self {
        Self {
            store: Arc::new(store),
            transactions,
        }
    }

    /// State backed by a fresh embedded store.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new(), TransactionConfig::no_retry())
    }

    pub async fn begin(&self) -> AppResult<Box<dyn StoreTx>> {
        Ok(self.store.begin().await?)
    }
}
