//! OCR and tagging for a single box.
//!
//! Results are returned to the caller and never committed, so the user can
//! review them before they land in the annotation's text.

use koma_core::annotation::AnnotationType;
use koma_core::error::CoreError;
use koma_core::geometry::{BoundingBox, DraftBox};
use koma_core::recognition::{validate_threshold, TagResult, Tagger, TextRecognizer};
use koma_core::repository::AnnotationRepository;
use koma_core::types::AnnotationId;

use crate::error::EditorError;
use crate::store::AnnotationStore;

/// What to run recognition over.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionTarget {
    /// An existing annotation; its box and type are used.
    Annotation(AnnotationId),
    /// A box that has not been saved yet, such as a finished [`DraftBox`].
    Region {
        bbox: BoundingBox,
        kind: AnnotationType,
    },
}

impl RecognitionTarget {
    /// Target the box of a finished drag, or `None` if the drag was too small.
    pub fn from_draft(draft: DraftBox, kind: AnnotationType) -> Option<Self> {
        draft.finish().map(|bbox| Self::Region { bbox, kind })
    }
}

fn resolve<R: AnnotationRepository>(
    store: &AnnotationStore<R>,
    target: &RecognitionTarget,
) -> Result<(BoundingBox, AnnotationType), EditorError> {
    match target {
        RecognitionTarget::Annotation(id) => store.get(id).map(|a| (a.bbox, a.kind)).ok_or_else(|| {
            store.rejected(CoreError::NotFound {
                entity: "Annotation",
                id: id.clone(),
            })
        }),
        RecognitionTarget::Region { bbox, kind } => Ok((*bbox, *kind)),
    }
}

/// Transcribe the text inside `target`.
pub async fn recognize_text<R, O>(
    store: &AnnotationStore<R>,
    ocr: &O,
    target: &RecognitionTarget,
) -> Result<String, EditorError>
where
    R: AnnotationRepository,
    O: TextRecognizer,
{
    let page_id = store.current_page_id()?;
    let (bbox, _) = resolve(store, target)?;

    match ocr.recognize_text(&page_id, &bbox).await {
        Ok(text) => {
            tracing::debug!(page_id = %page_id, chars = text.chars().count(), "OCR finished");
            Ok(text)
        }
        Err(err) => {
            tracing::warn!(page_id = %page_id, error = %err, "OCR failed");
            store.notifications().error(format!("OCR failed: {err}"));
            Err(err.into())
        }
    }
}

/// Propose tags for `target`, using its type as the classification hint.
pub async fn tag<R, T>(
    store: &AnnotationStore<R>,
    tagger: &T,
    target: &RecognitionTarget,
    threshold: f64,
) -> Result<TagResult, EditorError>
where
    R: AnnotationRepository,
    T: Tagger,
{
    let page_id = store.current_page_id()?;
    validate_threshold(threshold).map_err(|e| store.rejected(e))?;
    let (bbox, hint) = resolve(store, target)?;

    match tagger.tag(&page_id, &bbox, threshold, hint).await {
        Ok(result) => {
            tracing::debug!(page_id = %page_id, tags = result.tags.len(), threshold, "Tagging finished");
            Ok(result)
        }
        Err(err) => {
            tracing::warn!(page_id = %page_id, error = %err, "Tagging failed");
            store.notifications().error(format!("Tagging failed: {err}"));
            Err(err.into())
        }
    }
}
