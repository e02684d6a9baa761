//! Shared application state

use std::sync::Arc;

use crate::backend::{ElasticsearchBackend, SearchBackend};
use crate::config::Config;
use crate::registry::RegistryStore;
use crate::services::SearchService;
use crate::{Error, Result};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub registry: Arc<RegistryStore>,
    pub backend: Arc<dyn SearchBackend>,
    pub search_service: Arc<SearchService>,
}

impl AppState {
    /// Load reference data and connect the Elasticsearch backend.
    pub async fn new(config: Config) -> Result<Self> {
        let registry_config = config.registry.clone();
        let registry = tokio::task::spawn_blocking(move || RegistryStore::load(registry_config))
            .await
            .map_err(|e| Error::Internal(format!("Registry load task failed: {e}")))??;
        let backend = ElasticsearchBackend::new(&config.backend)?;

        tracing::info!(
            backend = %config.backend.url,
            index = %config.backend.index,
            timeout_secs = config.backend.timeout_secs,
            "Search backend configured"
        );

        Ok(Self::with_parts(config, registry, Arc::new(backend)))
    }

    /// Assemble state from prepared parts.
    pub fn with_parts(
        config: Config,
        registry: RegistryStore,
        backend: Arc<dyn SearchBackend>,
    ) -> Self {
        let registry = Arc::new(registry);
        let search_service = Arc::new(SearchService::new(
            registry.clone(),
            backend.clone(),
            config.formatter(),
            config.backend.timeout(),
        ));

        Self {
            config: Arc::new(config),
            registry,
            backend,
            search_service,
        }
    }
}
