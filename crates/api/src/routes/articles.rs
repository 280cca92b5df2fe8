//! Route definitions for the `/articles` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::articles;
use crate::state::AppState;

/// Routes mounted at `/articles`.
///
/// ```text
/// GET    /                 -> list
/// POST   /                 -> create
/// GET    /{id}             -> get_by_id
/// PUT    /{id}             -> update
/// DELETE /{id}             -> delete (soft)
/// POST   /{id}/restore     -> restore
/// GET    /{id}/versions    -> list_versions
/// POST   /{id}/versions    -> create_version
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(articles::list).post(articles::create))
        .route(
            "/{id}",
            get(articles::get_by_id)
                .put(articles::update)
                .delete(articles::delete),
        )
        .route("/{id}/restore", post(articles::restore))
        .route(
            "/{id}/versions",
            get(articles::list_versions).post(articles::create_version),
        )
}
