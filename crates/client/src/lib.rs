//! HTTP collaborators for the koma editor.

pub mod api;
pub mod config;

pub use api::{KomaApi, KomaApiError};
pub use config::{ClientConfig, ConfigError};
