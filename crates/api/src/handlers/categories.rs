//! Handlers for the `/categories` resource.
//!
//! Reads are public. Writes require the staff role.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use revoltwiki_core::error::CoreError;
use revoltwiki_core::types::DbId;
use revoltwiki_core::wiki::validate_title;
use revoltwiki_db::models::category::{
    Category, CategoryResponse, CreateCategory, UpdateCategory,
};
use revoltwiki_db::repositories::{ArticleRepo, CategoryRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireStaff;
use crate::response::DataResponse;
use crate::state::AppState;

async fn with_articles(pool: &sqlx::PgPool, category: Category) -> AppResult<CategoryResponse> {
    let articles = ArticleRepo::ids_by_category(pool, category.id).await?;
    Ok(CategoryResponse::new(category, articles))
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Category",
        id,
    })
}

/// GET /api/v1/categories
pub async fn list(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<CategoryResponse>>>> {
    let categories = CategoryRepo::list(&state.pool).await?;
    let mut data = Vec::with_capacity(categories.len());
    for category in categories {
        data.push(with_articles(&state.pool, category).await?);
    }
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/categories
pub async fn create(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Json(input): Json<CreateCategory>,
) -> AppResult<(StatusCode, Json<DataResponse<CategoryResponse>>)> {
    validate_title(&input.title)?;
    let category = CategoryRepo::create(&state.pool, &input).await?;

    tracing::info!(
        member_id = user.member_id,
        category_id = category.id,
        "Category created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CategoryResponse::new(category, Vec::new()),
        }),
    ))
}

/// GET /api/v1/categories/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CategoryResponse>>> {
    let category = CategoryRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    let data = with_articles(&state.pool, category).await?;
    Ok(Json(DataResponse { data }))
}

/// PUT /api/v1/categories/{id}
pub async fn update(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCategory>,
) -> AppResult<Json<DataResponse<CategoryResponse>>> {
    if let Some(ref title) = input.title {
        validate_title(title)?;
    }
    let category = CategoryRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;

    tracing::info!(member_id = user.member_id, category_id = id, "Category updated");

    let data = with_articles(&state.pool, category).await?;
    Ok(Json(DataResponse { data }))
}

/// DELETE /api/v1/categories/{id}
///
/// Articles in the category are kept and become uncategorised.
pub async fn delete(
    RequireStaff(user): RequireStaff,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !CategoryRepo::delete(&state.pool, id).await? {
        return Err(not_found(id));
    }
    tracing::info!(member_id = user.member_id, category_id = id, "Category deleted");
    Ok(StatusCode::NO_CONTENT)
}
