//! Persistence collaborator interface.
//!
//! Defines [`AnnotationRepository`], the trait every annotation store
//! implements (HTTP client, in-memory store, file-backed server store), and
//! the [`RepositoryError`] it reports.

use std::future::Future;

use crate::annotation::{Annotation, AnnotationDraft, PageAnnotations};
use crate::types::AnnotationId;

/// Errors reported by a persistence collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    /// The page or annotation does not exist in the store.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The store rejected the request (non-success status, invalid payload).
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The store could not be reached or the exchange failed midway.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for page annotations.
///
/// Every method may fail; callers treat any failure as "local state can no
/// longer be trusted" and refetch the page.
pub trait AnnotationRepository: Send + Sync {
    /// Load a page document with all of its annotations.
    fn get(&self, page: &str) -> impl Future<Output = Result<PageAnnotations, RepositoryError>> + Send;

    /// Store a new annotation and return it with its minted id and final order.
    fn create(
        &self,
        draft: &AnnotationDraft,
    ) -> impl Future<Output = Result<Annotation, RepositoryError>> + Send;

    /// Replace the mutable fields of an existing annotation.
    fn update(
        &self,
        id: &str,
        draft: &AnnotationDraft,
    ) -> impl Future<Output = Result<Annotation, RepositoryError>> + Send;

    /// Remove an annotation. Other orders are left untouched.
    fn delete(&self, page: &str, id: &str) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Renumber a page to follow `ids`.
    fn reorder(
        &self,
        page: &str,
        ids: &[AnnotationId],
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Replace the free-form page summary.
    fn update_summary(
        &self,
        page: &str,
        summary: &str,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Mark the page as finished (or not).
    fn set_completed(
        &self,
        page: &str,
        completed: bool,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
