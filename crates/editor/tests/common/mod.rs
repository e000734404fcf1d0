#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use koma_core::annotation::{Annotation, AnnotationDraft, AnnotationType, PageAnnotations};
use koma_core::geometry::BoundingBox;
use koma_core::recognition::{RecognitionError, TagResult, Tagger, TextRecognizer, Tag};
use koma_core::repository::{AnnotationRepository, RepositoryError};
use koma_core::types::AnnotationId;
use koma_editor::{AnnotationStore, MemoryRepository, NotificationBus};

pub const PAGE: &str = "00001";

/// Box x-coordinate that makes the stub recognisers fail.
pub const FAILING_X: f64 = 999.0;

pub fn anno(id: &str, order: u32, kind: AnnotationType) -> Annotation {
    Annotation {
        id: id.to_string(),
        kind,
        subtype: None,
        order,
        bbox: BoundingBox::new(10.0, 10.0, 40.0, 40.0),
        bbox_rel: None,
        text: String::new(),
        character_id: None,
    }
}

pub fn page_of(annotations: Vec<Annotation>) -> PageAnnotations {
    PageAnnotations {
        annotations,
        ..PageAnnotations::empty(PAGE)
    }
}

/// Dialogue annotations with the given `(id, order)` pairs.
pub fn dialogue_page(orders: &[(&str, u32)]) -> PageAnnotations {
    page_of(
        orders
            .iter()
            .map(|(id, order)| anno(id, *order, AnnotationType::Dialogue))
            .collect(),
    )
}

/// Sorted `(id, order)` pairs for comparison.
pub fn orders(annotations: &[Annotation]) -> Vec<(String, u32)> {
    let mut v: Vec<(String, u32)> = annotations
        .iter()
        .map(|a| (a.id.clone(), a.order))
        .collect();
    v.sort();
    v
}

pub fn pairs(expected: &[(&str, u32)]) -> Vec<(String, u32)> {
    let mut v: Vec<(String, u32)> = expected
        .iter()
        .map(|(id, order)| (id.to_string(), *order))
        .collect();
    v.sort();
    v
}

// ---------------------------------------------------------------------------
// Scripted repository
// ---------------------------------------------------------------------------

/// In-memory repository that can be told to fail specific writes.
#[derive(Default)]
pub struct FlakyRepository {
    pub inner: MemoryRepository,
    updates: AtomicUsize,
    reorders: AtomicUsize,
    /// 1-based `update` call that fails; 0 disables.
    fail_update_at: AtomicUsize,
    fail_reorder: AtomicBool,
    fail_create: AtomicBool,
}

impl FlakyRepository {
    pub fn with_page(page: PageAnnotations) -> Self {
        Self {
            inner: MemoryRepository::with_page(page),
            ..Default::default()
        }
    }

    pub fn fail_update_at(&self, call: usize) {
        self.fail_update_at.store(call, Ordering::SeqCst);
    }

    pub fn fail_reorder(&self, fail: bool) {
        self.fail_reorder.store(fail, Ordering::SeqCst);
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn update_calls(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn reorder_calls(&self) -> usize {
        self.reorders.load(Ordering::SeqCst)
    }

    pub async fn stored(&self) -> PageAnnotations {
        self.inner.snapshot(PAGE).await.expect("page exists")
    }
}

fn injected() -> RepositoryError {
    RepositoryError::Unavailable("injected failure".into())
}

impl AnnotationRepository for FlakyRepository {
    async fn get(&self, page: &str) -> Result<PageAnnotations, RepositoryError> {
        self.inner.get(page).await
    }

    async fn create(&self, draft: &AnnotationDraft) -> Result<Annotation, RepositoryError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.create(draft).await
    }

    async fn update(&self, id: &str, draft: &AnnotationDraft) -> Result<Annotation, RepositoryError> {
        let call = self.updates.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.fail_update_at.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.update(id, draft).await
    }

    async fn delete(&self, page: &str, id: &str) -> Result<(), RepositoryError> {
        self.inner.delete(page, id).await
    }

    async fn reorder(&self, page: &str, ids: &[AnnotationId]) -> Result<(), RepositoryError> {
        self.reorders.fetch_add(1, Ordering::SeqCst);
        if self.fail_reorder.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.reorder(page, ids).await
    }

    async fn update_summary(&self, page: &str, summary: &str) -> Result<(), RepositoryError> {
        self.inner.update_summary(page, summary).await
    }

    async fn set_completed(&self, page: &str, completed: bool) -> Result<(), RepositoryError> {
        self.inner.set_completed(page, completed).await
    }
}

/// Store over a flaky repository with `page` already loaded.
pub async fn loaded_store(page: PageAnnotations) -> AnnotationStore<FlakyRepository> {
    let bus = Arc::new(NotificationBus::default());
    let mut store = AnnotationStore::new(FlakyRepository::with_page(page), bus);
    store.load(PAGE).await.expect("load page");
    store
}

// ---------------------------------------------------------------------------
// Stub recognisers
// ---------------------------------------------------------------------------

pub struct StubOcr;

impl TextRecognizer for StubOcr {
    async fn recognize_text(&self, _page: &str, bbox: &BoundingBox) -> Result<String, RecognitionError> {
        if bbox.x == FAILING_X {
            return Err(RecognitionError::Unavailable("ocr model offline".into()));
        }
        Ok(format!("text@{}", bbox.y))
    }
}

/// Records the hint and threshold it was called with.
#[derive(Default)]
pub struct StubTagger {
    pub calls: std::sync::Mutex<Vec<(AnnotationType, f64)>>,
}

impl Tagger for StubTagger {
    async fn tag(
        &self,
        _page: &str,
        bbox: &BoundingBox,
        threshold: f64,
        hint: AnnotationType,
    ) -> Result<TagResult, RecognitionError> {
        self.calls.lock().unwrap().push((hint, threshold));
        if bbox.x == FAILING_X {
            return Err(RecognitionError::Rejected {
                status: 500,
                message: "tagger crashed".into(),
            });
        }
        Ok(TagResult {
            text: "1girl, smile".into(),
            tags: vec![
                Tag {
                    tag: "1girl".into(),
                    confidence: 0.98,
                },
                Tag {
                    tag: "smile".into(),
                    confidence: 0.71,
                },
            ],
        })
    }
}
