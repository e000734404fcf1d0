//! The editor session: one page's annotations plus the collaborator that
//! persists them.
//!
//! [`AnnotationStore`] is the only owner of the in-memory collection. Every
//! mutating call writes through to the [`AnnotationRepository`], updates the
//! local copy on success, and publishes a notification either way. A failed
//! write returns an [`EditorError`] whose `requires_reload()` tells the
//! caller the local copy must be refetched; [`AnnotationStore::recover`]
//! applies that policy.

use std::sync::Arc;

use koma_core::annotation::{
    normalize_subtype, Annotation, AnnotationDraft, AnnotationType, BodyPartSubtype,
    PageAnnotations,
};
use koma_core::error::CoreError;
use koma_core::geometry::{validate_box, BoundingBox};
use koma_core::repository::{AnnotationRepository, RepositoryError};
use koma_core::ruby;
use koma_core::sequence;

use crate::error::EditorError;
use crate::notify::NotificationBus;
use crate::sequence::SequenceManager;

/// User input for a new annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnnotation {
    pub kind: AnnotationType,
    pub subtype: Option<BodyPartSubtype>,
    pub bbox: BoundingBox,
    /// Display-form text; ruby notation is encoded before saving.
    pub text: String,
    pub character_id: Option<String>,
    /// Explicit reading position. `None` appends after the current maximum.
    pub order: Option<u32>,
}

impl NewAnnotation {
    pub fn new(kind: AnnotationType, bbox: BoundingBox) -> Self {
        Self {
            kind,
            subtype: None,
            bbox,
            text: String::new(),
            character_id: None,
            order: None,
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_subtype(mut self, subtype: BodyPartSubtype) -> Self {
        self.subtype = Some(subtype);
        self
    }

    pub fn with_character(mut self, character_id: impl Into<String>) -> Self {
        self.character_id = Some(character_id.into());
        self
    }
}

fn not_found(id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "Annotation",
        id: id.to_string(),
    }
}

/// Clamp up to the minimum size, then reject anything still unusable.
fn committed_box(bbox: BoundingBox) -> Result<BoundingBox, CoreError> {
    let bbox = bbox.with_min_size();
    validate_box(&bbox)?;
    Ok(bbox)
}

/// Editor context for a single page.
pub struct AnnotationStore<R> {
    repo: R,
    bus: Arc<NotificationBus>,
    page: Option<PageAnnotations>,
}

impl<R: AnnotationRepository> AnnotationStore<R> {
    pub fn new(repo: R, bus: Arc<NotificationBus>) -> Self {
        Self {
            repo,
            bus,
            page: None,
        }
    }

    // -- read access --------------------------------------------------------

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn notifications(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    pub fn page(&self) -> Option<&PageAnnotations> {
        self.page.as_ref()
    }

    pub fn page_id(&self) -> Option<&str> {
        self.page.as_ref().map(|p| p.image_id.as_str())
    }

    /// Annotations of the loaded page in storage order; empty when no page
    /// is loaded.
    pub fn annotations(&self) -> &[Annotation] {
        self.page
            .as_ref()
            .map(|p| p.annotations.as_slice())
            .unwrap_or(&[])
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations().iter().find(|a| a.id == id)
    }

    /// Distinct character ids used on the page, sorted.
    pub fn character_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .annotations()
            .iter()
            .filter_map(|a| a.character_id.as_deref())
            .filter(|c| !c.trim().is_empty())
            .map(str::to_string)
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Reading sequence with `N` / `N-r` group labels.
    pub fn labelled(&self) -> Vec<(String, &Annotation)> {
        sequence::labelled_sequence(self.annotations())
    }

    /// Stored text converted back to the authoring notation.
    pub fn display_text(&self, id: &str) -> Option<String> {
        self.get(id).map(|a| ruby::decode(&a.text))
    }

    /// Sequencing operations over this session's collection.
    pub fn sequence(&mut self) -> SequenceManager<'_, R> {
        SequenceManager::new(self)
    }

    // -- loading ------------------------------------------------------------

    /// Fetch `page_id` from the store, replacing any previously loaded page.
    pub async fn load(&mut self, page_id: &str) -> Result<&PageAnnotations, EditorError> {
        match self.repo.get(page_id).await {
            Ok(page) => {
                tracing::info!(
                    page_id = %page_id,
                    count = page.annotations.len(),
                    "Page loaded"
                );
                Ok(self.page.insert(page))
            }
            Err(err) => Err(self.persistence_failed("load page", err)),
        }
    }

    /// Discard local state and refetch the current page.
    pub async fn reload(&mut self) -> Result<(), EditorError> {
        let page_id = self.current_page_id()?;
        self.load(&page_id).await?;
        Ok(())
    }

    /// Reload when `err` says local state can no longer be trusted.
    ///
    /// Returns whether a reload happened.
    pub async fn recover(&mut self, err: &EditorError) -> Result<bool, EditorError> {
        if !err.requires_reload() {
            return Ok(false);
        }
        tracing::debug!(error = %err, "Reloading page after failed write");
        self.reload().await?;
        Ok(true)
    }

    // -- annotation mutations -------------------------------------------------

    /// Create an annotation from a drawn box.
    ///
    /// The box is clamped up to the minimum size. Without an explicit order
    /// the annotation is appended locally; with one, the store may shift
    /// other annotations to make room, so the page is refetched.
    pub async fn create(&mut self, new: NewAnnotation) -> Result<Annotation, EditorError> {
        let page_id = self.current_page_id()?;
        let bbox = committed_box(new.bbox).map_err(|e| self.rejected(e))?;
        if let Some(order) = new.order {
            sequence::validate_new_order(self.annotations(), order).map_err(|e| self.rejected(e))?;
        }

        let draft = AnnotationDraft {
            image_id: page_id.clone(),
            kind: new.kind,
            subtype: new.subtype,
            order: new.order,
            bbox,
            text: ruby::encode(&new.text),
            character_id: new.character_id,
        }
        .normalized();

        let created = match self.repo.create(&draft).await {
            Ok(created) => created,
            Err(err) => return Err(self.persistence_failed("create annotation", err)),
        };

        if draft.order.is_some() {
            self.reload().await?;
        } else {
            self.annotations_mut()?.push(created.clone());
        }

        tracing::info!(
            page_id = %page_id,
            annotation_id = %created.id,
            order = created.order,
            kind = created.kind.as_str(),
            "Annotation created"
        );
        self.bus
            .info(format!("Created {} #{}", created.kind.label(), created.order));
        Ok(created)
    }

    /// Replace the text, encoding ruby notation first.
    pub async fn update_text(&mut self, id: &str, text: &str) -> Result<Annotation, EditorError> {
        let encoded = ruby::encode(text);
        self.update_with(id, "update text", |draft| draft.text = encoded)
            .await
    }

    /// Change the classification; the subtype is normalised for the new type.
    pub async fn retype(
        &mut self,
        id: &str,
        kind: AnnotationType,
        subtype: Option<BodyPartSubtype>,
    ) -> Result<Annotation, EditorError> {
        self.update_with(id, "change type", |draft| {
            draft.kind = kind;
            draft.subtype = normalize_subtype(kind, subtype);
        })
        .await
    }

    pub async fn set_character(
        &mut self,
        id: &str,
        character_id: Option<String>,
    ) -> Result<Annotation, EditorError> {
        let character_id = character_id.filter(|c| !c.trim().is_empty());
        self.update_with(id, "change character", |draft| {
            draft.character_id = character_id
        })
        .await
    }

    /// Persist the final geometry of a move/resize.
    pub async fn commit_box(
        &mut self,
        id: &str,
        bbox: BoundingBox,
    ) -> Result<Annotation, EditorError> {
        let bbox = committed_box(bbox).map_err(|e| self.rejected(e))?;
        self.update_with(id, "update box", |draft| draft.bbox = bbox)
            .await
    }

    /// Remove an annotation. Remaining orders are left as they are.
    pub async fn delete(&mut self, id: &str) -> Result<(), EditorError> {
        let page_id = self.current_page_id()?;
        if self.get(id).is_none() {
            return Err(self.rejected(not_found(id)));
        }

        if let Err(err) = self.repo.delete(&page_id, id).await {
            return Err(self.persistence_failed("delete annotation", err));
        }
        self.annotations_mut()?.retain(|a| a.id != id);

        tracing::info!(page_id = %page_id, annotation_id = %id, "Annotation deleted");
        self.bus.info("Annotation deleted");
        Ok(())
    }

    // -- page metadata --------------------------------------------------------

    pub async fn update_summary(&mut self, summary: &str) -> Result<(), EditorError> {
        let page_id = self.current_page_id()?;
        if let Err(err) = self.repo.update_summary(&page_id, summary).await {
            return Err(self.persistence_failed("update summary", err));
        }
        if let Some(page) = self.page.as_mut() {
            page.page_summary = Some(summary.to_string());
        }
        tracing::info!(page_id = %page_id, "Page summary updated");
        self.bus.info("Summary saved");
        Ok(())
    }

    pub async fn set_completed(&mut self, completed: bool) -> Result<(), EditorError> {
        let page_id = self.current_page_id()?;
        if let Err(err) = self.repo.set_completed(&page_id, completed).await {
            return Err(self.persistence_failed("update status", err));
        }
        if let Some(page) = self.page.as_mut() {
            page.is_completed = completed;
        }
        tracing::info!(page_id = %page_id, completed, "Page status updated");
        self.bus.info(if completed {
            "Page marked as completed"
        } else {
            "Page marked as in progress"
        });
        Ok(())
    }

    // -- crate-internal plumbing ----------------------------------------------

    pub(crate) fn current_page_id(&self) -> Result<String, EditorError> {
        self.page_id()
            .map(str::to_string)
            .ok_or(EditorError::NoPage)
    }

    pub(crate) fn annotations_mut(&mut self) -> Result<&mut Vec<Annotation>, EditorError> {
        self.page
            .as_mut()
            .map(|p| &mut p.annotations)
            .ok_or(EditorError::NoPage)
    }

    /// Report a local validation failure. Nothing was written.
    pub(crate) fn rejected(&self, err: CoreError) -> EditorError {
        tracing::warn!(error = %err, "Operation rejected");
        self.bus.error(err.to_string());
        err.into()
    }

    /// Report a failed write. The caller must treat local state as stale.
    pub(crate) fn persistence_failed(&self, action: &str, err: RepositoryError) -> EditorError {
        tracing::warn!(page_id = ?self.page_id(), action, error = %err, "Persistence failed");
        self.bus.error(format!("Failed to {action}: {err}"));
        err.into()
    }

    /// Write one annotation's full state through `update`, then mirror the
    /// stored result locally.
    pub(crate) async fn update_with(
        &mut self,
        id: &str,
        action: &str,
        edit: impl FnOnce(&mut AnnotationDraft),
    ) -> Result<Annotation, EditorError> {
        let page_id = self.current_page_id()?;
        let Some(current) = self.get(id) else {
            return Err(self.rejected(not_found(id)));
        };
        let mut draft = AnnotationDraft::from_annotation(&page_id, current);
        edit(&mut draft);

        let updated = match self.repo.update(id, &draft).await {
            Ok(updated) => updated,
            Err(err) => return Err(self.persistence_failed(action, err)),
        };

        if let Some(slot) = self.annotations_mut()?.iter_mut().find(|a| a.id == id) {
            *slot = updated.clone();
        }
        tracing::info!(page_id = %page_id, annotation_id = %id, action, "Annotation updated");
        self.bus.info(format!("Annotation #{} saved", updated.order));
        Ok(updated)
    }
}
