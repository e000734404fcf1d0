//! Request handlers.
//!
//! Handlers validate path parameters, delegate to the [`PageStore`] held in
//! [`AppState`] and map errors via [`AppError`].
//!
//! [`PageStore`]: crate::storage::PageStore
//! [`AppState`]: crate::state::AppState
//! [`AppError`]: crate::error::AppError

pub mod annotations;
pub mod pages;
