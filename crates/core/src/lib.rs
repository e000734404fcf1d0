//! Domain core of the koma manga annotation editor.
//!
//! Everything here is pure: data model, ruby markup codec and sanitiser,
//! box edit geometry, reading-order planners, and the collaborator traits
//! the editor and server crates implement. No I/O happens in this crate.

pub mod annotation;
pub mod error;
pub mod geometry;
pub mod recognition;
pub mod repository;
pub mod ruby;
pub mod sanitize;
pub mod sequence;
pub mod types;
