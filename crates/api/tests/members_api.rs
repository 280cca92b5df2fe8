//! HTTP-level integration tests for the `/members` endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, create_member, delete_auth, get, post_json, post_json_auth, put_json_auth,
};
use revoltwiki_db::repositories::{ArticleRepo, MemberRepo};
use sqlx::PgPool;

fn new_member_body(username: &str) -> serde_json::Value {
    serde_json::json!({
        "username": username,
        "email": format!("{username}@example.com"),
        "password": "a-long-enough-password",
        "first_name": "Jeffrey",
        "last_name": "Lebowski",
    })
}

// ---------------------------------------------------------------------------
// List and create
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_list_members_is_public(pool: PgPool) {
    create_member(&pool, "walter", false, false).await;
    let app = common::build_test_app(pool);

    let response = get(app, "/api/v1/members").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let members = json["data"].as_array().unwrap();
    assert!(members.iter().any(|m| m["username"] == "walter"));
    assert!(members.iter().all(|m| m.get("password_hash").is_none()));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_superuser_creates_member(pool: PgPool) {
    let admin = create_member(&pool, "admin", true, true).await;
    let app = common::build_test_app(pool);

    let response =
        post_json_auth(app, "/api/v1/members", new_member_body("dude"), &admin.token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let json = body_json(response).await;
    assert_eq!(json["data"]["username"], "dude");
    assert_eq!(json["data"]["full_name"], "Jeffrey Lebowski");
    assert_eq!(json["data"]["short_name"], "Jeffrey");
    assert_eq!(json["data"]["is_staff"], false);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_member_requires_superuser(pool: PgPool) {
    let staff = create_member(&pool, "staffer", true, false).await;

    let app = common::build_test_app(pool.clone());
    let response =
        post_json_auth(app, "/api/v1/members", new_member_body("dude"), &staff.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/members", new_member_body("dude")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_create_member_validates_fields(pool: PgPool) {
    let admin = create_member(&pool, "admin", true, true).await;

    let mut body = new_member_body("dude");
    body["password"] = "short".into();
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/members", body, &admin.token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "password");

    let mut body = new_member_body("dude");
    body["email"] = "not-an-email".into();
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/members", body, &admin.token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "email");

    let mut body = new_member_body("dude");
    body["first_name"] = "x".repeat(31).into();
    let app = common::build_test_app(pool);
    let response = post_json_auth(app, "/api/v1/members", body, &admin.token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["field"], "first_name");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_duplicate_username_conflicts(pool: PgPool) {
    let admin = create_member(&pool, "admin", true, true).await;
    create_member(&pool, "dude", false, false).await;
    let app = common::build_test_app(pool);

    let response =
        post_json_auth(app, "/api/v1/members", new_member_body("dude"), &admin.token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_member_detail_lists_contributions(pool: PgPool) {
    let dude = create_member(&pool, "dude", false, false).await;

    let app = common::build_test_app(pool.clone());
    let first = body_json(
        post_json_auth(
            app,
            "/api/v1/articles",
            serde_json::json!({ "title": "White Russian", "content": "Vodka" }),
            &dude.token,
        )
        .await,
    )
    .await;
    let first_id = first["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    post_json_auth(
        app,
        &format!("/api/v1/articles/{first_id}/versions"),
        serde_json::json!({ "content": "Vodka, Kahlua" }),
        &dude.token,
    )
    .await;

    let app = common::build_test_app(pool.clone());
    let second = body_json(
        post_json_auth(
            app,
            "/api/v1/articles",
            serde_json::json!({ "title": "Bowling", "content": "Strike" }),
            &dude.token,
        )
        .await,
    )
    .await;
    let second_id = second["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool);
    let response = get(app, &format!("/api/v1/members/{}", dude.id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["contributions_by_version"].as_array().unwrap().len(), 3);
    assert_eq!(
        json["data"]["contributions_by_article"],
        serde_json::json!([first_id, second_id])
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_get_missing_member_returns_404(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/members/999999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_member_updates_own_profile(pool: PgPool) {
    let dude = create_member(&pool, "dude", false, false).await;
    let app = common::build_test_app(pool);

    let response = put_json_auth(
        app,
        &format!("/api/v1/members/{}", dude.id),
        serde_json::json!({ "first_name": "The", "last_name": "Dude" }),
        &dude.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["full_name"], "The Dude");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_member_cannot_update_someone_else(pool: PgPool) {
    let dude = create_member(&pool, "dude", false, false).await;
    let walter = create_member(&pool, "walter", false, false).await;
    let app = common::build_test_app(pool);

    let response = put_json_auth(
        app,
        &format!("/api/v1/members/{}", walter.id),
        serde_json::json!({ "first_name": "Donny" }),
        &dude.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_only_superuser_changes_role_flags(pool: PgPool) {
    let dude = create_member(&pool, "dude", false, false).await;
    let admin = create_member(&pool, "admin", true, true).await;

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/members/{}", dude.id),
        serde_json::json!({ "is_staff": true }),
        &dude.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool);
    let response = put_json_auth(
        app,
        &format!("/api/v1/members/{}", dude.id),
        serde_json::json!({ "is_staff": true }),
        &admin.token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["is_staff"], true);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../db/migrations")]
async fn test_delete_member_hands_articles_to_placeholder(pool: PgPool) {
    let admin = create_member(&pool, "admin", true, true).await;
    let dude = create_member(&pool, "dude", false, false).await;

    let app = common::build_test_app(pool.clone());
    let created = body_json(
        post_json_auth(
            app,
            "/api/v1/articles",
            serde_json::json!({ "title": "Rug", "content": "It really tied the room together" }),
            &dude.token,
        )
        .await,
    )
    .await;
    let article_id = created["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/v1/members/{}", dude.id), &admin.token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let sentinel = MemberRepo::find_by_username(&pool, "deleted")
        .await
        .unwrap()
        .unwrap();
    let article = ArticleRepo::find_by_id(&pool, article_id).await.unwrap().unwrap();
    assert_eq!(article.created_by, sentinel.id);
    let detail = ArticleRepo::detail(&pool, article).await.unwrap();
    assert_eq!(detail.authors, vec![sentinel.id]);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_placeholder_member_cannot_be_deleted(pool: PgPool) {
    let admin = create_member(&pool, "admin", true, true).await;
    let sentinel = MemberRepo::find_by_username(&pool, "deleted")
        .await
        .unwrap()
        .unwrap();
    let app = common::build_test_app(pool);

    let response =
        delete_auth(app, &format!("/api/v1/members/{}", sentinel.id), &admin.token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_delete_member_requires_superuser(pool: PgPool) {
    let staff = create_member(&pool, "staffer", true, false).await;
    let dude = create_member(&pool, "dude", false, false).await;
    let app = common::build_test_app(pool);

    let response = delete_auth(app, &format!("/api/v1/members/{}", dude.id), &staff.token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
