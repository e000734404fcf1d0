//! OCR and image-tagging collaborator interfaces.
//!
//! Recognition never mutates annotations itself: results are handed back to
//! the caller, which commits them through the annotation store.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::annotation::AnnotationType;
use crate::error::CoreError;
use crate::geometry::BoundingBox;
use crate::types::AnnotationId;

/// Confidence floor used when no threshold is configured.
pub const DEFAULT_TAGGER_THRESHOLD: f64 = 0.6;

/// Errors reported by a recognition service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecognitionError {
    #[error("recognition service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("recognition service unavailable: {0}")]
    Unavailable(String),
}

/// One tag proposed by the tagger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub tag: String,
    pub confidence: f64,
}

/// Tagger output: a comma-joined summary plus the individual tags.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TagResult {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Transcribes the text inside a page region.
pub trait TextRecognizer: Send + Sync {
    /// Best-effort transcription; an empty string is a valid answer.
    fn recognize_text(
        &self,
        page: &str,
        bbox: &BoundingBox,
    ) -> impl Future<Output = Result<String, RecognitionError>> + Send;
}

/// Proposes descriptive tags for a page region.
pub trait Tagger: Send + Sync {
    fn tag(
        &self,
        page: &str,
        bbox: &BoundingBox,
        threshold: f64,
        hint: AnnotationType,
    ) -> impl Future<Output = Result<TagResult, RecognitionError>> + Send;
}

/// Threshold must be a probability.
pub fn validate_threshold(threshold: f64) -> Result<(), CoreError> {
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        return Err(CoreError::Validation(format!(
            "tagger threshold must be between 0 and 1, got {threshold}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch reporting
// ---------------------------------------------------------------------------

/// Aggregate outcome of running recognition over many annotations.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub succeeded: usize,
    /// Annotation id and human-readable reason for each failure.
    pub failures: Vec<(AnnotationId, String)>,
}

impl BatchReport {
    pub fn record_success(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self, id: impl Into<AnnotationId>, reason: impl Into<String>) {
        self.attempted += 1;
        self.failures.push((id.into(), reason.into()));
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// `"3/4 succeeded"` style summary.
    pub fn summary(&self) -> String {
        format!("{}/{} succeeded", self.succeeded, self.attempted)
    }
}
