//! Handlers for the `/article_versions` resource.
//!
//! Versions are append-only: there is no update or delete.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use revoltwiki_core::access::AccessLevel;
use revoltwiki_core::error::CoreError;
use revoltwiki_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use revoltwiki_core::permissions::{authorize, can_manage_version, Action, Caller};
use revoltwiki_core::types::DbId;
use revoltwiki_core::wiki::validate_content;
use revoltwiki_db::models::article_version::{
    ArticleVersion, CreateArticleVersion, VersionDiffResponse,
};
use revoltwiki_db::repositories::{ArticleRepo, ArticleVersionRepo};
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "ArticleVersion",
        id,
    })
}

async fn load_visible(pool: &PgPool, caller: &Caller, id: DbId) -> AppResult<ArticleVersion> {
    let version = ArticleVersionRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    if !can_manage_version(caller, Action::View, version.access_level()) {
        return Err(not_found(id));
    }
    Ok(version)
}

/// Save new content for a live article the member can read.
///
/// `missing` builds the error for an article that does not exist or is
/// hidden from the member.
pub(crate) async fn save_version<F>(
    pool: &PgPool,
    auth: &AuthUser,
    article_id: DbId,
    content: &str,
    missing: F,
) -> AppResult<ArticleVersion>
where
    F: Fn() -> AppError,
{
    let caller = auth.caller();
    let article = ArticleRepo::find_by_id(pool, article_id)
        .await?
        .ok_or_else(&missing)?;
    let access = article.access_level();
    if !can_manage_version(&caller, Action::View, access) {
        return Err(missing());
    }
    authorize(
        &caller,
        can_manage_version(&caller, Action::Create, access),
        "edit this article",
    )?;
    validate_content(content)?;

    let input = CreateArticleVersion {
        article_id,
        content: content.to_owned(),
    };
    let version = ArticleVersionRepo::create(pool, &input, auth.member_id)
        .await?
        .ok_or_else(&missing)?;

    tracing::info!(
        member_id = auth.member_id,
        article_id,
        version_id = version.id,
        "Article version created"
    );
    Ok(version)
}

/// GET /api/v1/article_versions
///
/// Versions of live articles the caller can read, newest first.
pub async fn list(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ArticleVersion>>>> {
    let caller = auth.caller();
    let visible = AccessLevel::visible_to(&caller.roles);
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(params.offset);

    let versions = ArticleVersionRepo::list(&state.pool, &visible, limit, offset).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// POST /api/v1/article_versions
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateArticleVersion>,
) -> AppResult<(StatusCode, Json<DataResponse<ArticleVersion>>)> {
    let article_id = input.article_id;
    let version = save_version(&state.pool, &auth, article_id, &input.content, || {
        AppError::Core(CoreError::invalid_field(
            "article",
            format!("Article {article_id} does not exist"),
        ))
    })
    .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: version })))
}

/// GET /api/v1/article_versions/{id}
pub async fn get_by_id(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ArticleVersion>>> {
    let version = load_visible(&state.pool, &auth.caller(), id).await?;
    Ok(Json(DataResponse { data: version }))
}

/// GET /api/v1/article_versions/{id}/diff
pub async fn diff(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<VersionDiffResponse>>> {
    let version = load_visible(&state.pool, &auth.caller(), id).await?;
    Ok(Json(DataResponse {
        data: VersionDiffResponse::from(&version),
    }))
}
