pub mod health;

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::handlers::{annotations, pages};
use crate::state::AppState;

/// Build the annotation API route tree.
///
/// Route hierarchy:
///
/// ```text
/// /settings                                       editor settings (GET, POST)
/// /pages                                          list page images
///
/// /annotations                                    create (POST)
/// /annotations/{image_id}                         page document
/// /annotations/{image_id}/reorder                 renumber page (PUT)
/// /annotations/{image_id}/summary                 page summary (PATCH)
/// /annotations/{image_id}/status                  completion flag (PATCH)
/// /annotations/{image_id}/{annotation_id}         update (PUT), delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/settings",
            get(pages::get_settings).post(pages::update_settings),
        )
        .route("/pages", get(pages::list_pages))
        .route("/annotations", post(annotations::create_annotation))
        .route("/annotations/{image_id}", get(annotations::get_page))
        .route(
            "/annotations/{image_id}/reorder",
            put(annotations::reorder_annotations),
        )
        .route(
            "/annotations/{image_id}/summary",
            patch(annotations::update_summary),
        )
        .route(
            "/annotations/{image_id}/status",
            patch(annotations::update_status),
        )
        .route(
            "/annotations/{image_id}/{annotation_id}",
            put(annotations::update_annotation).delete(annotations::delete_annotation),
        )
}
