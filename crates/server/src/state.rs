use std::sync::Arc;

use crate::config::ServerConfig;
use crate::settings::SettingsStore;
use crate::storage::PageStore;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Page documents and images under the data directory.
    pub pages: Arc<PageStore>,
    /// Persisted editor settings.
    pub settings: Arc<SettingsStore>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let pages = Arc::new(PageStore::new(config.data_dir.clone()));
        let settings = Arc::new(SettingsStore::new(
            config.data_dir.clone(),
            config.default_tagger_threshold,
        ));
        Self {
            config: Arc::new(config),
            pages,
            settings,
        }
    }
}
