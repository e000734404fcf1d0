//! File-backed page storage.
//!
//! One pretty-printed JSON document per page under `<data>/annotations/`,
//! images under `<data>/images/`. Every read-modify-write holds the store's
//! write lock so concurrent requests cannot interleave; reads share the lock.
//! Documents are written to a temporary file and renamed into place.

use std::io;
use std::path::{Path, PathBuf};

use koma_core::annotation::{
    new_annotation_id, normalize_subtype, relative_box, Annotation, AnnotationDraft, ImageSize,
    PageAnnotations, PageListing,
};
use koma_core::error::CoreError;
use koma_core::geometry::validate_box;
use koma_core::repository::{AnnotationRepository, RepositoryError};
use koma_core::sequence;
use koma_core::types::AnnotationId;
use tokio::sync::RwLock;

/// Image extensions tried for a page, in lookup order.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Errors from the page storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Rejected input or a missing page/annotation.
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A JSON document on disk could not be parsed or written.
    #[error("Malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),

    /// The page image header could not be read.
    #[error("Unreadable image: {0}")]
    Image(#[from] image::ImageError),
}

fn not_found(entity: &'static str, id: &str) -> CoreError {
    CoreError::NotFound {
        entity,
        id: id.to_string(),
    }
}

/// Page ids become file names, so only a conservative alphabet is allowed.
pub fn validate_page_id(image_id: &str) -> Result<(), CoreError> {
    let valid = !image_id.is_empty()
        && image_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(CoreError::Validation(format!(
            "Invalid image id '{image_id}'. Use letters, digits, '_' or '-'"
        )));
    }
    Ok(())
}

pub struct PageStore {
    data_dir: PathBuf,
    lock: RwLock<()>,
}

impl PageStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    pub fn annotations_dir(&self) -> PathBuf {
        self.data_dir.join("annotations")
    }

    fn document_path(&self, image_id: &str) -> PathBuf {
        self.annotations_dir().join(format!("{image_id}.json"))
    }

    /// First existing image file for `image_id`, with its file name.
    async fn find_image(&self, image_id: &str) -> Option<(PathBuf, String)> {
        for ext in IMAGE_EXTENSIONS {
            let filename = format!("{image_id}.{ext}");
            let path = self.images_dir().join(&filename);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Some((path, filename));
            }
        }
        None
    }

    // -- documents ------------------------------------------------------------

    async fn load_existing(&self, image_id: &str) -> Result<Option<PageAnnotations>, StorageError> {
        match tokio::fs::read_to_string(self.document_path(image_id)).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Stored document, or a fresh one when only the image exists.
    async fn load_or_init(&self, image_id: &str) -> Result<PageAnnotations, StorageError> {
        validate_page_id(image_id)?;
        if let Some(doc) = self.load_existing(image_id).await? {
            return Ok(doc);
        }
        let (path, filename) = self
            .find_image(image_id)
            .await
            .ok_or_else(|| not_found("Image", image_id))?;
        let (width, height) = image::image_dimensions(&path)?;
        tracing::debug!(image_id, width, height, "Initialised page document");
        Ok(PageAnnotations {
            image_filename: filename,
            image_size: ImageSize { width, height },
            page_summary: Some(String::new()),
            ..PageAnnotations::empty(image_id)
        })
    }

    /// Existing document only; used where a missing page is an error.
    async fn load_required(&self, image_id: &str) -> Result<PageAnnotations, StorageError> {
        validate_page_id(image_id)?;
        self.load_existing(image_id)
            .await?
            .ok_or_else(|| not_found("Page", image_id).into())
    }

    async fn save(&self, doc: &PageAnnotations) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(self.annotations_dir()).await?;
        let raw = serde_json::to_string_pretty(doc)?;
        let path = self.document_path(&doc.image_id);
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, raw).await?;
        tokio::fs::rename(&staging, &path).await?;
        Ok(())
    }

    // -- operations -----------------------------------------------------------

    pub async fn page(&self, image_id: &str) -> Result<PageAnnotations, StorageError> {
        let _guard = self.lock.read().await;
        self.load_or_init(image_id).await
    }

    /// All page images, sorted by id.
    pub async fn list_pages(&self) -> Result<Vec<PageListing>, StorageError> {
        let _guard = self.lock.read().await;
        let mut listings = Vec::new();
        let mut entries = match tokio::fs::read_dir(self.images_dir()).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(listings),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !is_image || validate_page_id(id).is_err() {
                continue;
            }
            let doc = self.load_existing(id).await.ok().flatten();
            listings.push(PageListing {
                id: id.to_string(),
                has_annotation: doc.is_some(),
                is_completed: doc.is_some_and(|d| d.is_completed),
            });
        }

        listings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listings)
    }

    pub async fn create(&self, draft: &AnnotationDraft) -> Result<Annotation, StorageError> {
        validate_box(&draft.bbox)?;
        let draft = draft.clone().normalized();

        let _guard = self.lock.write().await;
        let mut doc = self.load_or_init(&draft.image_id).await?;

        let annotation = Annotation {
            id: new_annotation_id(),
            kind: draft.kind,
            subtype: draft.subtype,
            order: 0,
            bbox: draft.bbox,
            bbox_rel: relative_box(&draft.bbox, doc.image_size),
            text: draft.text,
            character_id: draft.character_id,
        };
        let id = annotation.id.clone();
        let shifted = sequence::insert_annotation(&mut doc.annotations, annotation, draft.order);
        self.save(&doc).await?;

        let created = doc
            .find(&id)
            .cloned()
            .ok_or_else(|| CoreError::Internal(format!("annotation {id} vanished after insert")))?;
        tracing::info!(
            image_id = %doc.image_id,
            annotation_id = %id,
            order = created.order,
            shifted = shifted.len(),
            "Annotation stored"
        );
        Ok(created)
    }

    pub async fn update(
        &self,
        image_id: &str,
        id: &str,
        draft: &AnnotationDraft,
    ) -> Result<Annotation, StorageError> {
        validate_box(&draft.bbox)?;

        let _guard = self.lock.write().await;
        let mut doc = self.load_required(image_id).await?;
        let size = doc.image_size;
        let annotation = doc
            .annotations
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| not_found("Annotation", id))?;

        annotation.kind = draft.kind;
        annotation.subtype = normalize_subtype(draft.kind, draft.subtype);
        if let Some(order) = draft.order {
            annotation.order = order.max(1);
        }
        annotation.bbox = draft.bbox;
        annotation.bbox_rel = relative_box(&draft.bbox, size);
        annotation.text = draft.text.clone();
        annotation.character_id = draft.character_id.clone().filter(|c| !c.is_empty());
        let updated = annotation.clone();

        self.save(&doc).await?;
        Ok(updated)
    }

    pub async fn delete(&self, image_id: &str, id: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;
        let mut doc = self.load_required(image_id).await?;
        let before = doc.annotations.len();
        doc.annotations.retain(|a| a.id != id);
        if doc.annotations.len() == before {
            return Err(not_found("Annotation", id).into());
        }
        self.save(&doc).await
    }

    /// Returns the number of annotations on the page.
    pub async fn reorder(&self, image_id: &str, ids: &[AnnotationId]) -> Result<usize, StorageError> {
        let _guard = self.lock.write().await;
        let mut doc = self.load_required(image_id).await?;
        sequence::apply_reorder(&mut doc.annotations, ids);
        self.save(&doc).await?;
        Ok(doc.annotations.len())
    }

    pub async fn update_summary(&self, image_id: &str, summary: &str) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;
        let mut doc = self.load_or_init(image_id).await?;
        doc.page_summary = Some(summary.to_string());
        self.save(&doc).await
    }

    pub async fn set_completed(&self, image_id: &str, completed: bool) -> Result<(), StorageError> {
        let _guard = self.lock.write().await;
        let mut doc = self.load_or_init(image_id).await?;
        doc.is_completed = completed;
        self.save(&doc).await
    }
}

// ---------------------------------------------------------------------------
// Persistence collaborator
// ---------------------------------------------------------------------------

impl From<StorageError> for RepositoryError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Core(CoreError::NotFound { entity, id }) => Self::NotFound { entity, id },
            StorageError::Core(CoreError::Validation(msg)) => Self::Rejected {
                status: 400,
                message: msg,
            },
            other => Self::Unavailable(other.to_string()),
        }
    }
}

/// Lets an editor session work directly against the data directory.
impl AnnotationRepository for PageStore {
    async fn get(&self, page: &str) -> Result<PageAnnotations, RepositoryError> {
        Ok(self.page(page).await?)
    }

    async fn create(&self, draft: &AnnotationDraft) -> Result<Annotation, RepositoryError> {
        Ok(PageStore::create(self, draft).await?)
    }

    async fn update(&self, id: &str, draft: &AnnotationDraft) -> Result<Annotation, RepositoryError> {
        Ok(PageStore::update(self, &draft.image_id, id, draft).await?)
    }

    async fn delete(&self, page: &str, id: &str) -> Result<(), RepositoryError> {
        Ok(PageStore::delete(self, page, id).await?)
    }

    async fn reorder(&self, page: &str, ids: &[AnnotationId]) -> Result<(), RepositoryError> {
        PageStore::reorder(self, page, ids).await?;
        Ok(())
    }

    async fn update_summary(&self, page: &str, summary: &str) -> Result<(), RepositoryError> {
        Ok(PageStore::update_summary(self, page, summary).await?)
    }

    async fn set_completed(&self, page: &str, completed: bool) -> Result<(), RepositoryError> {
        Ok(PageStore::set_completed(self, page, completed).await?)
    }
}
