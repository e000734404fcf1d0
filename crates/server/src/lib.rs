//! Koma annotation server library.
//!
//! Exposes config, state, storage, error handling and routes so integration
//! tests and the binary entrypoint share them.

pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod routes;
pub mod settings;
pub mod state;
pub mod storage;
