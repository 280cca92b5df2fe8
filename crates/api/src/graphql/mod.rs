//! Read-only GraphQL endpoint at `/graphql`.
//!
//! Resolvers go through the same repositories and visibility rules as the
//! REST handlers. An article or version the caller may not read resolves to
//! `null` and is left out of lists.

mod query;
mod types;

use async_graphql::{EmptyMutation, EmptySubscription, Schema};
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::extract::State;
use axum::routing::get;
use axum::{Extension, Router};

pub use query::QueryRoot;

use crate::middleware::auth::MaybeAuthUser;
use crate::state::AppState;

/// Deepest selection a query may nest (article, versions, parent article...).
pub const MAX_QUERY_DEPTH: usize = 8;

pub type WikiSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

pub fn build_schema() -> WikiSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .limit_depth(MAX_QUERY_DEPTH)
        .finish()
}

/// GET|POST /graphql
///
/// An invalid bearer token is rejected with 401 before the query runs.
async fn execute(
    State(state): State<AppState>,
    Extension(schema): Extension<WikiSchema>,
    auth: MaybeAuthUser,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let request = request
        .into_inner()
        .data(state.pool.clone())
        .data(auth.caller());
    schema.execute(request).await.into()
}

/// Mount the GraphQL endpoint (root level, beside `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/graphql", get(execute).post(execute))
        .layer(Extension(build_schema()))
}
