pub mod article_versions;
pub mod articles;
pub mod auth;
pub mod categories;
pub mod health;
pub mod members;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/me                                         current member (requires auth)
///
/// /members                                         list, create (superuser)
/// /members/{id}                                    get, update (self or superuser),
///                                                  delete (superuser)
///
/// /categories                                      list, create (staff)
/// /categories/{id}                                 get, update, delete (staff)
///
/// /articles                                        list, create (requires auth)
/// /articles/{id}                                   get, update, soft delete (staff)
/// /articles/{id}/restore                           restore (staff)
/// /articles/{id}/versions                          list, create (requires auth)
///
/// /article_versions                                list, create (requires auth)
/// /article_versions/{id}                           get
/// /article_versions/{id}/diff                      diff against the previous version
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/members", members::router())
        .nest("/categories", categories::router())
        .nest("/articles", articles::router())
        .nest("/article_versions", article_versions::router())
}
