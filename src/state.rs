use std::sync::Arc;

use crate::config::AppConfig;
use crate::store::{MongoStore, Store};

/// Shared application state: one store handle plus the loaded configuration,
/// both built once at startup and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(MongoStore::connect(&config.store).await?) as Arc<dyn Store>;
        Ok(Self::from_parts(store, config))
    }

    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    #[cfg(test)]
    pub(crate) fn fake() -> Self {
        Self::from_parts(
            Arc::new(crate::store::memory::MemoryStore::default()),
            Arc::new(AppConfig::fake()),
        )
    }
}
