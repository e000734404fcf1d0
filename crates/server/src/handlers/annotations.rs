//! Handlers for page annotation documents.
//!
//! Every write goes through [`PageStore`](crate::storage::PageStore), which
//! serialises read-modify-write cycles per data directory.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use koma_core::annotation::AnnotationDraft;
use koma_core::types::AnnotationId;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
   Request bodies
   -------------------------------------------------------------------------- */

#[derive(Debug, Deserialize)]
pub struct ReorderInput {
    pub annotation_ids: Vec<AnnotationId>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryInput {
    pub page_summary: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub is_completed: bool,
}

#[derive(Debug, Serialize)]
pub struct ReorderResult {
    pub updated: usize,
}

/* --------------------------------------------------------------------------
   Handlers
   -------------------------------------------------------------------------- */

/// GET /annotations/{image_id}
///
/// Returns the stored document, or a fresh empty one when only the image
/// exists yet.
pub async fn get_page(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let page = state.pages.page(&image_id).await?;
    Ok(Json(DataResponse { data: page }))
}

/// POST /annotations
pub async fn create_annotation(
    State(state): State<AppState>,
    Json(input): Json<AnnotationDraft>,
) -> AppResult<impl IntoResponse> {
    let annotation = state.pages.create(&input).await?;

    tracing::info!(
        image_id = %input.image_id,
        annotation_id = %annotation.id,
        kind = annotation.kind.as_str(),
        "Annotation created"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: annotation })))
}

/// PUT /annotations/{image_id}/{annotation_id}
///
/// The page in the path wins over any `image_id` in the body.
pub async fn update_annotation(
    State(state): State<AppState>,
    Path((image_id, annotation_id)): Path<(String, String)>,
    Json(mut input): Json<AnnotationDraft>,
) -> AppResult<impl IntoResponse> {
    input.image_id = image_id;
    let annotation = state
        .pages
        .update(&input.image_id, &annotation_id, &input)
        .await?;

    tracing::info!(
        image_id = %input.image_id,
        annotation_id = %annotation_id,
        order = annotation.order,
        "Annotation updated"
    );

    Ok(Json(DataResponse { data: annotation }))
}

/// DELETE /annotations/{image_id}/{annotation_id}
///
/// Other annotations keep their orders; gaps are closed by an explicit
/// compaction from the editor.
pub async fn delete_annotation(
    State(state): State<AppState>,
    Path((image_id, annotation_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    state.pages.delete(&image_id, &annotation_id).await?;

    tracing::info!(image_id = %image_id, annotation_id = %annotation_id, "Annotation deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /annotations/{image_id}/reorder
///
/// Renumbers the page densely in the given id order.
pub async fn reorder_annotations(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Json(input): Json<ReorderInput>,
) -> AppResult<impl IntoResponse> {
    let updated = state.pages.reorder(&image_id, &input.annotation_ids).await?;

    tracing::info!(image_id = %image_id, updated, "Annotations reordered");

    Ok(Json(DataResponse {
        data: ReorderResult { updated },
    }))
}

/// PATCH /annotations/{image_id}/summary
pub async fn update_summary(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Json(input): Json<SummaryInput>,
) -> AppResult<impl IntoResponse> {
    state
        .pages
        .update_summary(&image_id, &input.page_summary)
        .await?;
    tracing::debug!(image_id = %image_id, "Page summary updated");
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /annotations/{image_id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
    Json(input): Json<StatusInput>,
) -> AppResult<impl IntoResponse> {
    state
        .pages
        .set_completed(&image_id, input.is_completed)
        .await?;
    tracing::info!(image_id = %image_id, completed = input.is_completed, "Page status updated");
    Ok(StatusCode::NO_CONTENT)
}
