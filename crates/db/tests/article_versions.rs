//! Integration tests for version creation and diff storage.
//!
//! Exercises `ArticleVersionRepo` against a real database:
//! - The first version's diff is a single insert of its content
//! - Later versions diff against the immediately preceding version
//! - Every save moves the article's current-version pointer
//! - Saving against a missing article writes nothing
//! - Version lists come back in the documented order
//! - Full rewrites of maximum-size content save promptly

use revoltwiki_core::access::AccessLevel;
use std::time::{Duration, Instant};

use revoltwiki_core::diff::{self, DiffOp, DiffSpan};
use revoltwiki_core::wiki::MAX_CONTENT_LEN;
use revoltwiki_db::models::article::CreateArticle;
use revoltwiki_db::models::article_version::CreateArticleVersion;
use revoltwiki_db::models::member::CreateMember;
use revoltwiki_db::repositories::{ArticleRepo, ArticleVersionRepo, MemberRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_member(pool: &PgPool, username: &str) -> i64 {
    MemberRepo::create(
        pool,
        &CreateMember {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: "hash".to_string(),
            first_name: None,
            last_name: None,
            is_staff: None,
            is_superuser: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn new_article(pool: &PgPool, title: &str, created_by: i64) -> i64 {
    ArticleRepo::create(
        pool,
        &CreateArticle {
            title: title.to_string(),
            category_id: None,
            access: None,
            content: None,
        },
        created_by,
    )
    .await
    .unwrap()
    .id
}

fn new_version(article_id: i64, content: &str) -> CreateArticleVersion {
    CreateArticleVersion {
        article_id,
        content: content.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_first_version_diff_is_single_insert(pool: PgPool) {
    let member = new_member(&pool, "dude").await;
    let article = new_article(&pool, "White Russian", member).await;

    let version = ArticleVersionRepo::create(&pool, &new_version(article, "Vodka, Kahlua"), member)
        .await
        .unwrap()
        .expect("article exists");

    assert_eq!(version.diff.0, vec![DiffSpan::new(DiffOp::Insert, "Vodka, Kahlua")]);
    assert_eq!(version.access, AccessLevel::ALL.bits());

    let stored = ArticleRepo::find_by_id(&pool, article).await.unwrap().unwrap();
    assert_eq!(stored.current_version_id, Some(version.id));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_second_version_diffs_against_first(pool: PgPool) {
    let member = new_member(&pool, "dude").await;
    let article = new_article(&pool, "Kahlua", member).await;
    let v1 = "Kahlua is a coffee liqueur";

    ArticleVersionRepo::create(&pool, &new_version(article, v1), member)
        .await
        .unwrap()
        .unwrap();
    let second = ArticleVersionRepo::create(
        &pool,
        &new_version(article, &format!("Add {v1}.")),
        member,
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(
        second.diff.0,
        vec![
            DiffSpan::new(DiffOp::Insert, "Add "),
            DiffSpan::new(DiffOp::Equal, v1),
            DiffSpan::new(DiffOp::Insert, "."),
        ]
    );
    assert_eq!(diff::source_text(&second.diff.0), v1);
    assert_eq!(diff::target_text(&second.diff.0), second.content);

    let stored = ArticleRepo::find_by_id(&pool, article).await.unwrap().unwrap();
    assert_eq!(stored.current_version_id, Some(second.id));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_each_version_diffs_against_its_predecessor(pool: PgPool) {
    let member = new_member(&pool, "donny").await;
    let article = new_article(&pool, "Bowling", member).await;
    let contents = ["", "strike", "spare and strike", "gutter"];

    let mut previous = String::new();
    for (i, content) in contents.iter().enumerate() {
        let version = ArticleVersionRepo::create(&pool, &new_version(article, content), member)
            .await
            .unwrap()
            .unwrap();
        if i > 0 {
            assert_eq!(diff::source_text(&version.diff.0), previous);
        }
        assert_eq!(diff::target_text(&version.diff.0), *content);
        previous = content.to_string();
    }

    let versions = ArticleVersionRepo::list_by_article(&pool, article).await.unwrap();
    let stored: Vec<&str> = versions.iter().map(|v| v.content.as_str()).collect();
    assert_eq!(stored, contents);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_versions_of_other_articles_do_not_interfere(pool: PgPool) {
    let member = new_member(&pool, "maude").await;
    let a = new_article(&pool, "Art", member).await;
    let b = new_article(&pool, "Rugs", member).await;

    ArticleVersionRepo::create(&pool, &new_version(a, "vaginal"), member)
        .await
        .unwrap();
    let first_b = ArticleVersionRepo::create(&pool, &new_version(b, "ties the room together"), member)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        first_b.diff.0,
        vec![DiffSpan::new(DiffOp::Insert, "ties the room together")]
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_missing_article_writes_nothing(pool: PgPool) {
    let member = new_member(&pool, "jackie").await;

    let result = ArticleVersionRepo::create(&pool, &new_version(999_999, "ransom"), member)
        .await
        .unwrap();
    assert!(result.is_none());

    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM article_versions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_article_created_with_content_has_first_version(pool: PgPool) {
    let member = new_member(&pool, "bunny").await;
    let article = ArticleRepo::create(
        &pool,
        &CreateArticle {
            title: "Toes".to_string(),
            category_id: None,
            access: Some(AccessLevel::STAFF.bits()),
            content: Some("a toe".to_string()),
        },
        member,
    )
    .await
    .unwrap();

    let version_id = article.current_version_id.expect("first version stored");
    let version = ArticleVersionRepo::find_by_id(&pool, version_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(version.article_id, article.id);
    assert_eq!(version.content, "a toe");
    assert_eq!(version.access, AccessLevel::STAFF.bits());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_list_filters_by_access_and_orders_newest_first(pool: PgPool) {
    let member = new_member(&pool, "smokey").await;
    let open = new_article(&pool, "Open", member).await;
    let staff_only = ArticleRepo::create(
        &pool,
        &CreateArticle {
            title: "Staff".to_string(),
            category_id: None,
            access: Some(AccessLevel::STAFF.bits()),
            content: None,
        },
        member,
    )
    .await
    .unwrap()
    .id;

    let older = ArticleVersionRepo::create(&pool, &new_version(open, "one"), member)
        .await
        .unwrap()
        .unwrap();
    ArticleVersionRepo::create(&pool, &new_version(staff_only, "secret"), member)
        .await
        .unwrap();
    let newer = ArticleVersionRepo::create(&pool, &new_version(open, "two"), member)
        .await
        .unwrap()
        .unwrap();

    let public = ArticleVersionRepo::list(&pool, &[AccessLevel::ALL.bits()], 10, 0)
        .await
        .unwrap();
    let ids: Vec<i64> = public.iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    let all = ArticleVersionRepo::list(&pool, &[1, 2, 4, 6], 10, 0).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_latest_content(pool: PgPool) {
    let member = new_member(&pool, "karl").await;
    let article = new_article(&pool, "Nihilism", member).await;
    assert_eq!(ArticleVersionRepo::latest_content(&pool, article).await.unwrap(), None);

    ArticleVersionRepo::create(&pool, &new_version(article, "we believe"), member)
        .await
        .unwrap();
    ArticleVersionRepo::create(&pool, &new_version(article, "we believe in nothing"), member)
        .await
        .unwrap();

    assert_eq!(
        ArticleVersionRepo::latest_content(&pool, article).await.unwrap().as_deref(),
        Some("we believe in nothing")
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_full_rewrite_of_large_article_saves_promptly(pool: PgPool) {
    let member = new_member(&pool, "maude").await;
    let article = new_article(&pool, "Action Painting", member).await;
    let before = "a".repeat(MAX_CONTENT_LEN);
    let after = "b".repeat(MAX_CONTENT_LEN);

    ArticleVersionRepo::create(&pool, &new_version(article, &before), member)
        .await
        .unwrap();
    let started = Instant::now();
    let version = ArticleVersionRepo::create(&pool, &new_version(article, &after), member)
        .await
        .unwrap()
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(10), "took {:?}", started.elapsed());

    assert_eq!(diff::source_text(&version.diff.0), before);
    assert_eq!(diff::target_text(&version.diff.0), after);
    let stats = version.diff_stats();
    assert_eq!(stats.insertions, MAX_CONTENT_LEN);
    assert_eq!(stats.deletions, MAX_CONTENT_LEN);

    let current = ArticleRepo::find_by_id(&pool, article).await.unwrap().unwrap();
    assert_eq!(current.current_version_id, Some(version.id));
}
