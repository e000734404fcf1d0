//! Editor settings persisted as `<data>/settings.json`.
//!
//! The file is optional: until the first update the configured default
//! threshold is served.

use std::io;
use std::path::PathBuf;

use koma_core::recognition::validate_threshold;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::storage::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub tagger_threshold: f64,
}

pub struct SettingsStore {
    path: PathBuf,
    default: Settings,
    lock: RwLock<()>,
}

impl SettingsStore {
    pub fn new(data_dir: impl Into<PathBuf>, default_tagger_threshold: f64) -> Self {
        Self {
            path: data_dir.into().join("settings.json"),
            default: Settings {
                tagger_threshold: default_tagger_threshold,
            },
            lock: RwLock::new(()),
        }
    }

    /// Stored settings, or the defaults when nothing has been saved.
    pub async fn current(&self) -> Result<Settings, StorageError> {
        let _guard = self.lock.read().await;
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(self.default),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn update(&self, settings: Settings) -> Result<Settings, StorageError> {
        validate_threshold(settings.tagger_threshold)?;

        let _guard = self.lock.write().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let raw = serde_json::to_string_pretty(&settings)?;
        let staging = self.path.with_extension("json.tmp");
        tokio::fs::write(&staging, raw).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        tracing::info!(tagger_threshold = settings.tagger_threshold, "Settings saved");
        Ok(settings)
    }
}
