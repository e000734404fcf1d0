use koma_core::error::CoreError;
use koma_core::recognition::RecognitionError;
use koma_core::repository::RepositoryError;

/// Failure of a mutating editor operation.
///
/// Returned instead of reloading implicitly: the caller inspects
/// [`requires_reload`](EditorError::requires_reload) and decides when to
/// refetch the page (see `AnnotationStore::recover`).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditorError {
    /// Rejected locally before any write was issued.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A write to the persistence collaborator failed.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] RepositoryError),

    /// The OCR or tagging collaborator failed. Local state is untouched.
    #[error("Recognition failed: {0}")]
    Recognition(#[from] RecognitionError),

    /// No page has been loaded into the session yet.
    #[error("No page loaded")]
    NoPage,
}

impl EditorError {
    /// Whether local state may have diverged from the store.
    pub fn requires_reload(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}
