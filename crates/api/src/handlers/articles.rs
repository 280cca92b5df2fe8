//! Handlers for the `/articles` resource.
//!
//! Articles the caller may not read are reported as missing, so their
//! existence does not leak.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use revoltwiki_core::access::AccessLevel;
use revoltwiki_core::error::CoreError;
use revoltwiki_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use revoltwiki_core::permissions::{authorize, can_manage_article, Action, Caller};
use revoltwiki_core::types::DbId;
use revoltwiki_core::wiki::{ensure_current_version_belongs, validate_content, validate_title};
use revoltwiki_db::models::article::{
    Article, ArticleDetail, ArticleFilter, CreateArticle, UpdateArticle,
};
use revoltwiki_db::models::article_version::ArticleVersion;
use revoltwiki_db::repositories::{ArticleRepo, ArticleVersionRepo, CategoryRepo};
use serde::Deserialize;
use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::handlers::article_versions::save_version;
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::query::ArticleListParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Article",
        id,
    })
}

/// Load an article the caller may read. Unreadable articles are 404.
pub(crate) async fn load_visible(
    pool: &PgPool,
    caller: &Caller,
    id: DbId,
    include_deleted: bool,
) -> AppResult<Article> {
    let found = if include_deleted {
        ArticleRepo::find_by_id_include_deleted(pool, id).await?
    } else {
        ArticleRepo::find_by_id(pool, id).await?
    };
    let article = found.ok_or_else(|| not_found(id))?;

    if !can_manage_article(caller, Action::View, article.access_level()) {
        return Err(not_found(id));
    }
    Ok(article)
}

/// Parse a requested access mask. The caller must be able to read it,
/// otherwise they would lock themselves out of their own article.
fn requested_access(caller: &Caller, bits: i16) -> AppResult<AccessLevel> {
    let access = AccessLevel::from_bits(bits)?;
    if !access.permits(&caller.roles) {
        return Err(AppError::Core(CoreError::invalid_field(
            "access",
            format!("Access level '{}' would hide the article from you", access.label()),
        )));
    }
    Ok(access)
}

async fn ensure_category(pool: &PgPool, category_id: DbId) -> AppResult<()> {
    if CategoryRepo::find_by_id(pool, category_id).await?.is_none() {
        return Err(AppError::Core(CoreError::invalid_field(
            "category_id",
            format!("Category {category_id} does not exist"),
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /articles/{id}/versions`.
#[derive(Debug, Deserialize)]
pub struct NewVersionRequest {
    #[serde(default)]
    pub content: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/articles
///
/// `include_deleted` is ignored unless the caller is staff.
pub async fn list(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Query(params): Query<ArticleListParams>,
) -> AppResult<Json<DataResponse<Vec<ArticleDetail>>>> {
    let caller = auth.caller();
    let filter = ArticleFilter {
        category_id: params.category_id,
        include_deleted: params.include_deleted && caller.roles.staff(),
        visible_access: AccessLevel::visible_to(&caller.roles),
        limit: clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT),
        offset: clamp_offset(params.offset),
    };

    let articles = ArticleRepo::list(&state.pool, &filter).await?;
    let mut data = Vec::with_capacity(articles.len());
    for article in articles {
        data.push(ArticleRepo::detail(&state.pool, article).await?);
    }
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/articles
pub async fn create(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(mut input): Json<CreateArticle>,
) -> AppResult<(StatusCode, Json<DataResponse<ArticleDetail>>)> {
    let caller = auth.caller();
    authorize(
        &caller,
        can_manage_article(&caller, Action::Create, AccessLevel::ALL),
        "create articles",
    )?;

    validate_title(&input.title)?;
    if let Some(ref content) = input.content {
        validate_content(content)?;
    }
    if let Some(category_id) = input.category_id {
        ensure_category(&state.pool, category_id).await?;
    }
    let access = requested_access(&caller, input.access.unwrap_or(AccessLevel::ALL.bits()))?;
    input.access = Some(access.bits());

    let article = ArticleRepo::create(&state.pool, &input, auth.member_id).await?;

    tracing::info!(
        member_id = auth.member_id,
        article_id = article.id,
        access = access.bits(),
        "Article created"
    );

    let detail = ArticleRepo::detail(&state.pool, article).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

/// GET /api/v1/articles/{id}
pub async fn get_by_id(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ArticleDetail>>> {
    let article = load_visible(&state.pool, &auth.caller(), id, false).await?;
    let detail = ArticleRepo::detail(&state.pool, article).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// PUT /api/v1/articles/{id}
///
/// A new `current_version_id` must be one of this article's versions.
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateArticle>,
) -> AppResult<Json<DataResponse<ArticleDetail>>> {
    let caller = auth.caller();
    let existing = load_visible(&state.pool, &caller, id, false).await?;
    authorize(
        &caller,
        can_manage_article(&caller, Action::Update, existing.access_level()),
        "update this article",
    )?;

    if let Some(ref title) = input.title {
        validate_title(title)?;
    }
    if let Some(Some(category_id)) = input.category_id {
        ensure_category(&state.pool, category_id).await?;
    }
    if let Some(bits) = input.access {
        requested_access(&caller, bits)?;
    }
    if let Some(version_id) = input.current_version_id {
        let version = ArticleVersionRepo::find_by_id(&state.pool, version_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::invalid_field(
                    "current_version",
                    format!("Version {version_id} does not exist"),
                ))
            })?;
        ensure_current_version_belongs(id, version.article_id)?;
    }

    let article = ArticleRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(member_id = auth.member_id, article_id = id, "Article updated");

    let detail = ArticleRepo::detail(&state.pool, article).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// DELETE /api/v1/articles/{id}
///
/// Soft delete; the article and its versions stay in the database.
pub async fn delete(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let caller = auth.caller();
    let article = load_visible(&state.pool, &caller, id, false).await?;
    authorize(
        &caller,
        can_manage_article(&caller, Action::Delete, article.access_level()),
        "delete this article",
    )?;

    if !ArticleRepo::soft_delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(member_id = auth.member_id, article_id = id, "Article deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/articles/{id}/restore
pub async fn restore(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ArticleDetail>>> {
    let caller = auth.caller();
    let article = load_visible(&state.pool, &caller, id, true).await?;
    authorize(
        &caller,
        can_manage_article(&caller, Action::Delete, article.access_level()),
        "restore this article",
    )?;
    if !article.deleted {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Article {id} is not deleted"
        ))));
    }

    ArticleRepo::restore(&state.pool, id).await?;
    tracing::info!(member_id = auth.member_id, article_id = id, "Article restored");

    let article = ArticleRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let detail = ArticleRepo::detail(&state.pool, article).await?;
    Ok(Json(DataResponse { data: detail }))
}

/// GET /api/v1/articles/{id}/versions
///
/// Oldest first, each with its diff against the one before.
pub async fn list_versions(
    auth: MaybeAuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ArticleVersion>>>> {
    load_visible(&state.pool, &auth.caller(), id, false).await?;
    let versions = ArticleVersionRepo::list_by_article(&state.pool, id).await?;
    Ok(Json(DataResponse { data: versions }))
}

/// POST /api/v1/articles/{id}/versions
pub async fn create_version(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<NewVersionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ArticleVersion>>)> {
    let version = save_version(&state.pool, &auth, id, &input.content, || not_found(id)).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: version })))
}
