use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::settings::Settings;
use crate::state::AppState;

/// GET /pages
///
/// Every page image with whether it has a document yet and whether that
/// document is marked complete, sorted by id.
pub async fn list_pages(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let pages = state.pages.list_pages().await?;
    Ok(Json(DataResponse { data: pages }))
}

/// GET /settings
pub async fn get_settings(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let settings = state.settings.current().await?;
    Ok(Json(DataResponse { data: settings }))
}

/// POST /settings
///
/// Replace the editor settings; the threshold must lie in `[0, 1]`.
pub async fn update_settings(
    State(state): State<AppState>,
    Json(input): Json<Settings>,
) -> AppResult<impl IntoResponse> {
    let settings = state.settings.update(input).await?;
    Ok(Json(DataResponse { data: settings }))
}
