//! Application state.

use std::sync::Arc;

use sitesense_media::Pipeline;
use sitesense_storage::ObjectStoreClient;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<ObjectStoreClient>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let storage = ObjectStoreClient::from_env().await?;

        Ok(Self {
            config,
            storage: Arc::new(storage),
            pipeline: Arc::new(Pipeline::new()),
        })
    }
}
