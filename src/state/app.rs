use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::broadcast_service::Hub;
use crate::state::store::LatestStore;

/// Shared application state, built once in `main` and handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: LatestStore,
    pub hub: Hub,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let store = LatestStore::new();
        let hub = Hub::new(store.clone(), config.threshold_cm, config.subscriber_buffer);

        Self {
            config: Arc::new(config),
            store,
            hub,
        }
    }
}
