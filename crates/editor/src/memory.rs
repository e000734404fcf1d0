//! In-memory [`AnnotationRepository`], applying the HTTP server's box
//! validation, field normalisation, create and reorder rules. Page ids are
//! not restricted and no relative boxes are computed, since there is no
//! image. Used for offline sessions and tests.

use std::collections::HashMap;

use koma_core::annotation::{
    new_annotation_id, normalize_subtype, Annotation, AnnotationDraft, PageAnnotations,
};
use koma_core::geometry::{validate_box, BoundingBox};
use koma_core::repository::{AnnotationRepository, RepositoryError};
use koma_core::sequence;
use koma_core::types::{AnnotationId, PageId};
use tokio::sync::Mutex;

fn page_not_found(page: &str) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "Page",
        id: page.to_string(),
    }
}

fn annotation_not_found(id: &str) -> RepositoryError {
    RepositoryError::NotFound {
        entity: "Annotation",
        id: id.to_string(),
    }
}

/// Reject a box the server would answer with 400.
fn check_box(bbox: &BoundingBox) -> Result<(), RepositoryError> {
    validate_box(bbox).map_err(|err| RepositoryError::Rejected {
        status: 400,
        message: err.to_string(),
    })
}

#[derive(Default)]
pub struct MemoryRepository {
    pages: Mutex<HashMap<PageId, PageAnnotations>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with one page.
    pub fn with_page(page: PageAnnotations) -> Self {
        let mut pages = HashMap::new();
        pages.insert(page.image_id.clone(), page);
        Self {
            pages: Mutex::new(pages),
        }
    }

    pub async fn insert_page(&self, page: PageAnnotations) {
        self.pages.lock().await.insert(page.image_id.clone(), page);
    }

    /// Current stored state of a page.
    pub async fn snapshot(&self, page: &str) -> Option<PageAnnotations> {
        self.pages.lock().await.get(page).cloned()
    }
}

impl AnnotationRepository for MemoryRepository {
    async fn get(&self, page: &str) -> Result<PageAnnotations, RepositoryError> {
        self.pages
            .lock()
            .await
            .get(page)
            .cloned()
            .ok_or_else(|| page_not_found(page))
    }

    async fn create(&self, draft: &AnnotationDraft) -> Result<Annotation, RepositoryError> {
        check_box(&draft.bbox)?;
        let draft = draft.clone().normalized();
        let mut pages = self.pages.lock().await;
        let page = pages
            .entry(draft.image_id.clone())
            .or_insert_with(|| PageAnnotations::empty(draft.image_id.clone()));

        let annotation = Annotation {
            id: new_annotation_id(),
            kind: draft.kind,
            subtype: draft.subtype,
            order: 0,
            bbox: draft.bbox,
            bbox_rel: None,
            text: draft.text,
            character_id: draft.character_id,
        };
        let id = annotation.id.clone();
        sequence::insert_annotation(&mut page.annotations, annotation, draft.order);

        page.find(&id)
            .cloned()
            .ok_or_else(|| annotation_not_found(&id))
    }

    async fn update(&self, id: &str, draft: &AnnotationDraft) -> Result<Annotation, RepositoryError> {
        check_box(&draft.bbox)?;
        let mut pages = self.pages.lock().await;
        let page = pages
            .get_mut(&draft.image_id)
            .ok_or_else(|| page_not_found(&draft.image_id))?;
        let annotation = page
            .annotations
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| annotation_not_found(id))?;

        annotation.kind = draft.kind;
        annotation.subtype = normalize_subtype(draft.kind, draft.subtype);
        if let Some(order) = draft.order {
            annotation.order = order.max(1);
        }
        annotation.bbox = draft.bbox;
        annotation.text = draft.text.clone();
        annotation.character_id = draft.character_id.clone().filter(|c| !c.is_empty());
        Ok(annotation.clone())
    }

    async fn delete(&self, page: &str, id: &str) -> Result<(), RepositoryError> {
        let mut pages = self.pages.lock().await;
        let doc = pages.get_mut(page).ok_or_else(|| page_not_found(page))?;
        let before = doc.annotations.len();
        doc.annotations.retain(|a| a.id != id);
        if doc.annotations.len() == before {
            return Err(annotation_not_found(id));
        }
        Ok(())
    }

    async fn reorder(&self, page: &str, ids: &[AnnotationId]) -> Result<(), RepositoryError> {
        let mut pages = self.pages.lock().await;
        let doc = pages.get_mut(page).ok_or_else(|| page_not_found(page))?;
        sequence::apply_reorder(&mut doc.annotations, ids);
        Ok(())
    }

    async fn update_summary(&self, page: &str, summary: &str) -> Result<(), RepositoryError> {
        let mut pages = self.pages.lock().await;
        let doc = pages.get_mut(page).ok_or_else(|| page_not_found(page))?;
        doc.page_summary = Some(summary.to_string());
        Ok(())
    }

    async fn set_completed(&self, page: &str, completed: bool) -> Result<(), RepositoryError> {
        let mut pages = self.pages.lock().await;
        let doc = pages.get_mut(page).ok_or_else(|| page_not_found(page))?;
        doc.is_completed = completed;
        Ok(())
    }
}
