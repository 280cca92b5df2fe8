//! Route definitions for the `/article_versions` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::article_versions;
use crate::state::AppState;

/// Routes mounted at `/article_versions`.
///
/// ```text
/// GET    /             -> list
/// POST   /             -> create
/// GET    /{id}         -> get_by_id
/// GET    /{id}/diff    -> diff
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(article_versions::list).post(article_versions::create),
        )
        .route("/{id}", get(article_versions::get_by_id))
        .route("/{id}/diff", get(article_versions::diff))
}
