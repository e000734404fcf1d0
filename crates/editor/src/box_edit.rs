//! Pointer-driven move/resize of an existing box.
//!
//! Intermediate positions are preview only; the store is written once, on
//! release. Cancelling never touches the store.

use koma_core::annotation::Annotation;
use koma_core::geometry::{BoundingBox, BoxEdit, EditMode};
use koma_core::repository::AnnotationRepository;
use koma_core::types::AnnotationId;

use crate::error::EditorError;
use crate::store::AnnotationStore;

/// An in-flight edit of one annotation's box.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxEditSession {
    annotation_id: AnnotationId,
    edit: BoxEdit,
    preview: BoundingBox,
}

impl BoxEditSession {
    /// Start editing `annotation` if the pointer hits one of its handles or
    /// its interior.
    pub fn begin(annotation: &Annotation, px: f64, py: f64) -> Option<Self> {
        BoxEdit::begin(annotation.bbox, px, py).map(|edit| Self {
            annotation_id: annotation.id.clone(),
            edit,
            preview: annotation.bbox,
        })
    }

    /// Find what the pointer grabs on a page.
    ///
    /// The selected annotation wins so its handles stay reachable where it
    /// overlaps others; after that, later annotations are on top.
    pub fn pick(
        annotations: &[Annotation],
        selected: Option<&str>,
        px: f64,
        py: f64,
    ) -> Option<Self> {
        let selected_hit = selected
            .and_then(|id| annotations.iter().find(|a| a.id == id))
            .and_then(|a| Self::begin(a, px, py));
        selected_hit.or_else(|| {
            annotations
                .iter()
                .rev()
                .find_map(|a| Self::begin(a, px, py))
        })
    }

    pub fn annotation_id(&self) -> &str {
        &self.annotation_id
    }

    pub fn mode(&self) -> EditMode {
        self.edit.mode
    }

    pub fn original(&self) -> BoundingBox {
        self.edit.original
    }

    /// Box to draw while the pointer is at `(px, py)`.
    pub fn preview(&mut self, px: f64, py: f64) -> BoundingBox {
        self.preview = self.edit.box_at(px, py);
        self.preview
    }

    pub fn current(&self) -> BoundingBox {
        self.preview
    }

    /// Pointer released at `(px, py)`: persist the final box.
    ///
    /// Returns `None` without writing when the box did not change.
    pub async fn commit<R: AnnotationRepository>(
        self,
        store: &mut AnnotationStore<R>,
        px: f64,
        py: f64,
    ) -> Result<Option<Annotation>, EditorError> {
        let bbox = self.edit.box_at(px, py);
        if bbox == self.edit.original {
            tracing::debug!(annotation_id = %self.annotation_id, "Box unchanged");
            return Ok(None);
        }
        store
            .commit_box(&self.annotation_id, bbox)
            .await
            .map(Some)
    }

    /// Abandon the edit, returning the box to redraw.
    pub fn cancel(self) -> BoundingBox {
        tracing::debug!(annotation_id = %self.annotation_id, mode = self.edit.mode.as_str(), "Box edit cancelled");
        self.edit.original
    }
}
