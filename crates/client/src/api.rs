//! REST client for the annotation server and the recognition services.
//!
//! [`KomaApi`] implements the persistence, OCR and tagging collaborator
//! traits over HTTP using [`reqwest`]. Annotation endpoints answer with a
//! `{ "data": ... }` envelope; the recognition endpoints answer with a bare
//! JSON object.

use std::time::Duration;

use koma_core::annotation::{
    Annotation, AnnotationDraft, AnnotationType, PageAnnotations, PageListing,
};
use koma_core::geometry::BoundingBox;
use koma_core::recognition::{RecognitionError, TagResult, Tagger, TextRecognizer};
use koma_core::repository::{AnnotationRepository, RepositoryError};
use koma_core::types::AnnotationId;
use serde::{Deserialize, Serialize};

use crate::config::ClientConfig;

/// Header carrying the optional API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Errors from the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum KomaApiError {
    /// The HTTP request itself failed (network, DNS, TLS, decoding, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl KomaApiError {
    /// Map to a persistence failure; a 404 becomes `NotFound` for `entity`.
    fn into_repository(self, entity: &'static str, id: &str) -> RepositoryError {
        match self {
            Self::ApiError { status: 404, .. } => RepositoryError::NotFound {
                entity,
                id: id.to_string(),
            },
            Self::ApiError { status, body } => RepositoryError::Rejected {
                status,
                message: body,
            },
            Self::Request(err) => RepositoryError::Unavailable(err.to_string()),
        }
    }
}

impl From<KomaApiError> for RecognitionError {
    fn from(err: KomaApiError) -> Self {
        match err {
            KomaApiError::ApiError { status, body } => Self::Rejected {
                status,
                message: body,
            },
            KomaApiError::Request(err) => Self::Unavailable(err.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Wire payloads
// ---------------------------------------------------------------------------

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    data: T,
}

#[derive(Debug, Serialize, Deserialize)]
struct Settings {
    tagger_threshold: f64,
}

#[derive(Debug, Serialize)]
struct ReorderRequest<'a> {
    annotation_ids: &'a [AnnotationId],
}

#[derive(Debug, Serialize)]
struct SummaryRequest<'a> {
    page_summary: &'a str,
}

#[derive(Debug, Serialize)]
struct StatusRequest {
    is_completed: bool,
}

#[derive(Debug, Serialize)]
struct OcrRequest<'a> {
    image_id: &'a str,
    bbox: &'a BoundingBox,
}

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct TaggerRequest<'a> {
    image_id: &'a str,
    bbox: &'a BoundingBox,
    threshold: f64,
    annotation_type: AnnotationType,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP client for one annotation server.
#[derive(Clone)]
pub struct KomaApi {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl KomaApi {
    /// Create a client with default settings for `api_url`
    /// (e.g. `http://localhost:8000`).
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, None)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        api_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Build a client honouring the configured timeout and API key.
    pub fn from_config(config: &ClientConfig) -> Result<Self, KomaApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(
            client,
            config.api_url.clone(),
            config.api_key.clone(),
        ))
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<serde_json::Value, KomaApiError> {
        let response = self.request(reqwest::Method::GET, "/health").send().await?;
        Self::parse_response(response).await
    }

    /// `GET /settings`: the tagger threshold the server recommends.
    pub async fn tagger_threshold(&self) -> Result<f64, KomaApiError> {
        let response = self.request(reqwest::Method::GET, "/settings").send().await?;
        let settings: Settings = Self::parse_data(response).await?;
        Ok(settings.tagger_threshold)
    }

    /// `POST /settings`: store a new tagger threshold, returning the saved value.
    pub async fn set_tagger_threshold(&self, tagger_threshold: f64) -> Result<f64, KomaApiError> {
        let response = self
            .request(reqwest::Method::POST, "/settings")
            .json(&Settings { tagger_threshold })
            .send()
            .await?;
        let settings: Settings = Self::parse_data(response).await?;
        Ok(settings.tagger_threshold)
    }

    pub async fn list_pages(&self) -> Result<Vec<PageListing>, KomaApiError> {
        let response = self.request(reqwest::Method::GET, "/pages").send().await?;
        Self::parse_data(response).await
    }

    // ---- annotation endpoints ----

    pub async fn fetch_page(&self, image_id: &str) -> Result<PageAnnotations, KomaApiError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/annotations/{image_id}"))
            .send()
            .await?;
        Self::parse_data(response).await
    }

    pub async fn create_annotation(
        &self,
        draft: &AnnotationDraft,
    ) -> Result<Annotation, KomaApiError> {
        let response = self
            .request(reqwest::Method::POST, "/annotations")
            .json(draft)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    pub async fn update_annotation(
        &self,
        id: &str,
        draft: &AnnotationDraft,
    ) -> Result<Annotation, KomaApiError> {
        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/annotations/{}/{id}", draft.image_id),
            )
            .json(draft)
            .send()
            .await?;
        Self::parse_data(response).await
    }

    pub async fn delete_annotation(&self, image_id: &str, id: &str) -> Result<(), KomaApiError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/annotations/{image_id}/{id}"))
            .send()
            .await?;
        Self::check_status(response).await
    }

    pub async fn reorder_annotations(
        &self,
        image_id: &str,
        ids: &[AnnotationId],
    ) -> Result<(), KomaApiError> {
        let response = self
            .request(reqwest::Method::PUT, &format!("/annotations/{image_id}/reorder"))
            .json(&ReorderRequest {
                annotation_ids: ids,
            })
            .send()
            .await?;
        Self::check_status(response).await
    }

    pub async fn patch_summary(&self, image_id: &str, summary: &str) -> Result<(), KomaApiError> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("/annotations/{image_id}/summary"))
            .json(&SummaryRequest {
                page_summary: summary,
            })
            .send()
            .await?;
        Self::check_status(response).await
    }

    pub async fn patch_status(&self, image_id: &str, completed: bool) -> Result<(), KomaApiError> {
        let response = self
            .request(reqwest::Method::PATCH, &format!("/annotations/{image_id}/status"))
            .json(&StatusRequest {
                is_completed: completed,
            })
            .send()
            .await?;
        Self::check_status(response).await
    }

    // ---- recognition endpoints ----

    /// `POST /ocr`.
    pub async fn ocr(&self, image_id: &str, bbox: &BoundingBox) -> Result<String, KomaApiError> {
        let response = self
            .request(reqwest::Method::POST, "/ocr")
            .json(&OcrRequest { image_id, bbox })
            .send()
            .await?;
        let body: OcrResponse = Self::parse_response(response).await?;
        Ok(body.text)
    }

    /// `POST /tagger`.
    pub async fn tagger(
        &self,
        image_id: &str,
        bbox: &BoundingBox,
        threshold: f64,
        annotation_type: AnnotationType,
    ) -> Result<TagResult, KomaApiError> {
        let response = self
            .request(reqwest::Method::POST, "/tagger")
            .json(&TaggerRequest {
                image_id,
                bbox,
                threshold,
                annotation_type,
            })
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`KomaApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, KomaApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(KomaApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, KomaApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }

    /// Parse a successful `{ "data": T }` envelope.
    async fn parse_data<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, KomaApiError> {
        let envelope: DataResponse<T> = Self::parse_response(response).await?;
        Ok(envelope.data)
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), KomaApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collaborator implementations
// ---------------------------------------------------------------------------

impl AnnotationRepository for KomaApi {
    async fn get(&self, page: &str) -> Result<PageAnnotations, RepositoryError> {
        self.fetch_page(page)
            .await
            .map_err(|e| e.into_repository("Page", page))
    }

    async fn create(&self, draft: &AnnotationDraft) -> Result<Annotation, RepositoryError> {
        self.create_annotation(draft)
            .await
            .map_err(|e| e.into_repository("Page", &draft.image_id))
    }

    async fn update(&self, id: &str, draft: &AnnotationDraft) -> Result<Annotation, RepositoryError> {
        self.update_annotation(id, draft)
            .await
            .map_err(|e| e.into_repository("Annotation", id))
    }

    async fn delete(&self, page: &str, id: &str) -> Result<(), RepositoryError> {
        self.delete_annotation(page, id)
            .await
            .map_err(|e| e.into_repository("Annotation", id))
    }

    async fn reorder(&self, page: &str, ids: &[AnnotationId]) -> Result<(), RepositoryError> {
        self.reorder_annotations(page, ids)
            .await
            .map_err(|e| e.into_repository("Page", page))
    }

    async fn update_summary(&self, page: &str, summary: &str) -> Result<(), RepositoryError> {
        self.patch_summary(page, summary)
            .await
            .map_err(|e| e.into_repository("Page", page))
    }

    async fn set_completed(&self, page: &str, completed: bool) -> Result<(), RepositoryError> {
        self.patch_status(page, completed)
            .await
            .map_err(|e| e.into_repository("Page", page))
    }
}

impl TextRecognizer for KomaApi {
    async fn recognize_text(&self, page: &str, bbox: &BoundingBox) -> Result<String, RecognitionError> {
        let text = self.ocr(page, bbox).await?;
        tracing::debug!(page_id = %page, chars = text.chars().count(), "OCR result received");
        Ok(text)
    }
}

impl Tagger for KomaApi {
    async fn tag(
        &self,
        page: &str,
        bbox: &BoundingBox,
        threshold: f64,
        hint: AnnotationType,
    ) -> Result<TagResult, RecognitionError> {
        let result = self.tagger(page, bbox, threshold, hint).await?;
        tracing::debug!(page_id = %page, tags = result.tags.len(), "Tagger result received");
        Ok(result)
    }
}
