//! Route definitions for the `/members` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::members;
use crate::state::AppState;

/// Routes mounted at `/members`.
///
/// ```text
/// GET    /        -> list
/// POST   /        -> create (superuser)
/// GET    /{id}    -> get_by_id
/// PUT    /{id}    -> update (self or superuser)
/// DELETE /{id}    -> delete (superuser)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(members::list).post(members::create))
        .route(
            "/{id}",
            get(members::get_by_id)
                .put(members::update)
                .delete(members::delete),
        )
}
