//! Background tasks
//!
//! Reference data is re-read on a fixed interval so curated tables can be
//! updated without a restart.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::registry::RegistryStore;

/// Spawn the periodic registry reload. `None` when `interval` is zero.
pub fn spawn_registry_refresh(
    registry: Arc<RegistryStore>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() {
        tracing::info!("Registry refresh disabled");
        return None;
    }

    tracing::info!(interval_secs = interval.as_secs(), "Starting registry refresh task");
    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately; the store is already loaded.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match registry.reload().await {
                Ok(()) => tracing::info!("Reference data reloaded"),
                Err(e) => tracing::error!(error = %e, "Reference data reload failed, keeping previous snapshot"),
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;

    #[tokio::test]
    async fn zero_interval_spawns_nothing() {
        let registry = Arc::new(RegistryStore::load(RegistryConfig::default()).unwrap());
        assert!(spawn_registry_refresh(registry, Duration::ZERO).is_none());
    }
}
