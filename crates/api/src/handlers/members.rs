//! Handlers for the `/members` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use revoltwiki_core::error::CoreError;
use revoltwiki_core::member::contributions_by_article;
use revoltwiki_core::pagination::{clamp_limit, clamp_offset, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use revoltwiki_core::permissions::{authorize, can_manage_member, Action};
use revoltwiki_core::types::DbId;
use revoltwiki_core::wiki::{validate_email, validate_name, validate_username};
use revoltwiki_db::models::member::{
    CreateMember, Member, MemberDetail, MemberResponse, UpdateMember,
};
use revoltwiki_db::repositories::{ArticleVersionRepo, MemberRepo};
use serde::Deserialize;

use crate::auth::password::{hash_password, validate_password_strength, MIN_PASSWORD_LENGTH};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireSuperuser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/* --------------------------------------------------------------------------
Request types
-------------------------------------------------------------------------- */

/// Request body for `POST /members`.
#[derive(Debug, Deserialize)]
pub struct CreateMemberRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// Request body for `PUT /members/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMemberRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
}

/* --------------------------------------------------------------------------
Helpers
-------------------------------------------------------------------------- */

async fn ensure_member(pool: &sqlx::PgPool, id: DbId) -> AppResult<Member> {
    MemberRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Member",
            id,
        }))
}

fn check_password(password: &str) -> AppResult<String> {
    validate_password_strength(password, MIN_PASSWORD_LENGTH)
        .map_err(|msg| AppError::Core(CoreError::invalid_field("password", msg)))?;
    hash_password(password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))
}

/* --------------------------------------------------------------------------
Handlers
-------------------------------------------------------------------------- */

/// GET /api/v1/members
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<MemberResponse>>>> {
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT);
    let offset = clamp_offset(params.offset);

    let members = MemberRepo::list(&state.pool, limit, offset).await?;
    let data: Vec<MemberResponse> = members.iter().map(MemberResponse::from).collect();
    Ok(Json(DataResponse { data }))
}

/// POST /api/v1/members
///
/// Superusers only.
pub async fn create(
    RequireSuperuser(admin): RequireSuperuser,
    State(state): State<AppState>,
    Json(input): Json<CreateMemberRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<MemberResponse>>)> {
    validate_username(&input.username)?;
    validate_email(&input.email)?;
    if let Some(ref first) = input.first_name {
        validate_name("first_name", first)?;
    }
    if let Some(ref last) = input.last_name {
        validate_name("last_name", last)?;
    }
    let password_hash = check_password(&input.password)?;

    let member = MemberRepo::create(
        &state.pool,
        &CreateMember {
            username: input.username,
            email: input.email,
            password_hash,
            first_name: input.first_name,
            last_name: input.last_name,
            is_staff: input.is_staff,
            is_superuser: input.is_superuser,
        },
    )
    .await?;

    tracing::info!(
        admin_id = admin.member_id,
        member_id = member.id,
        "Member created"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: MemberResponse::from(&member),
        }),
    ))
}

/// GET /api/v1/members/{id}
///
/// Includes the member's contributions by version and by article.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<MemberDetail>>> {
    let member = ensure_member(&state.pool, id).await?;
    let contributions = ArticleVersionRepo::contributions(&state.pool, id).await?;

    let detail = MemberDetail {
        member: MemberResponse::from(&member),
        contributions_by_version: contributions.iter().map(|(v, _)| *v).collect(),
        contributions_by_article: contributions_by_article(contributions.iter().map(|(_, a)| *a)),
    };
    Ok(Json(DataResponse { data: detail }))
}

/// PUT /api/v1/members/{id}
///
/// Members edit their own profile; superusers edit anyone and are the only
/// ones who may change role flags.
pub async fn update(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMemberRequest>,
) -> AppResult<Json<DataResponse<MemberResponse>>> {
    let caller = auth.caller();
    authorize(
        &caller,
        can_manage_member(&caller, Action::Update, Some(id)),
        "update this member",
    )?;
    let changes_roles =
        input.is_staff.is_some() || input.is_superuser.is_some() || input.is_active.is_some();
    if changes_roles && !caller.roles.superuser() {
        return Err(AppError::Core(CoreError::Forbidden(
            "Only superusers may change role flags".into(),
        )));
    }

    let existing = ensure_member(&state.pool, id).await?;
    if existing.is_sentinel() {
        return Err(AppError::Core(CoreError::Conflict(
            "The deleted-member placeholder cannot be modified".into(),
        )));
    }

    if let Some(ref username) = input.username {
        validate_username(username)?;
    }
    if let Some(ref email) = input.email {
        validate_email(email)?;
    }
    if let Some(ref first) = input.first_name {
        validate_name("first_name", first)?;
    }
    if let Some(ref last) = input.last_name {
        validate_name("last_name", last)?;
    }
    let password_hash = input.password.as_deref().map(check_password).transpose()?;

    let update = UpdateMember {
        username: input.username,
        email: input.email,
        first_name: input.first_name,
        last_name: input.last_name,
        is_staff: input.is_staff,
        is_superuser: input.is_superuser,
        is_active: input.is_active,
    };
    let member = MemberRepo::update(&state.pool, id, &update)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Member",
            id,
        }))?;
    if let Some(hash) = password_hash {
        MemberRepo::update_password(&state.pool, id, &hash).await?;
    }

    tracing::info!(actor_id = auth.member_id, member_id = id, "Member updated");

    Ok(Json(DataResponse {
        data: MemberResponse::from(&member),
    }))
}

/// DELETE /api/v1/members/{id}
///
/// Superusers only. The member's articles and versions pass to the
/// deleted-member placeholder.
pub async fn delete(
    RequireSuperuser(admin): RequireSuperuser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let member = ensure_member(&state.pool, id).await?;
    if member.is_sentinel() {
        return Err(AppError::Core(CoreError::Conflict(
            "The deleted-member placeholder cannot be deleted".into(),
        )));
    }

    if !MemberRepo::delete_with_sentinel(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "Member",
            id,
        }));
    }

    tracing::info!(admin_id = admin.member_id, member_id = id, "Member deleted");
    Ok(StatusCode::NO_CONTENT)
}
