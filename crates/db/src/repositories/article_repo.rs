//! Repository for the `articles` table.
//!
//! Articles are soft-deleted. Content lives in `article_versions`; see
//! [`ArticleVersionRepo`](super::ArticleVersionRepo).

use revoltwiki_core::access::AccessLevel;
use revoltwiki_core::member::contributions_by_article;
use revoltwiki_core::types::DbId;
use sqlx::PgPool;

use crate::models::article::{Article, ArticleDetail, ArticleFilter, CreateArticle, UpdateArticle};
use crate::repositories::article_version_repo::ArticleVersionRepo;

/// Column list for articles queries.
const COLUMNS: &str = "id, title, category_id, current_version_id, access, deleted, \
    created_by, created_at, updated_at";

/// Provides CRUD operations for articles.
pub struct ArticleRepo;

impl ArticleRepo {
    /// Create an article, and its first version when `input.content` is set.
    pub async fn create(
        pool: &PgPool,
        input: &CreateArticle,
        created_by: DbId,
    ) -> Result<Article, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO articles (title, category_id, access, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let mut article = sqlx::query_as::<_, Article>(&query)
            .bind(&input.title)
            .bind(input.category_id)
            .bind(input.access.unwrap_or(AccessLevel::ALL.bits()))
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        if let Some(content) = &input.content {
            if let Some(version) =
                ArticleVersionRepo::create_inner(&mut tx, article.id, content, created_by).await?
            {
                article.current_version_id = Some(version.id);
            }
        }

        tx.commit().await?;
        Ok(article)
    }

    /// Find a live (not soft-deleted) article by ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Article>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM articles WHERE id = $1 AND deleted = false");
        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find an article by ID, including soft-deleted rows.
    pub async fn find_by_id_include_deleted(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Article>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM articles WHERE id = $1");
        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List articles, most recently updated first.
    pub async fn list(pool: &PgPool, filter: &ArticleFilter) -> Result<Vec<Article>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM articles
             WHERE ($1::BIGINT IS NULL OR category_id = $1)
               AND ($2 OR deleted = false)
               AND access = ANY($3)
             ORDER BY updated_at DESC, id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Article>(&query)
            .bind(filter.category_id)
            .bind(filter.include_deleted)
            .bind(&filter.visible_access)
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(pool)
            .await
    }

    /// Ids of a category's live articles.
    pub async fn ids_by_category(
        pool: &PgPool,
        category_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        let rows: Vec<(DbId,)> = sqlx::query_as(
            "SELECT id FROM articles
             WHERE category_id = $1 AND deleted = false
             ORDER BY id",
        )
        .bind(category_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Update a live article. Only non-`None` fields in `input` are applied.
    ///
    /// The caller checks that `current_version_id` belongs to this article;
    /// the composite foreign key rejects it otherwise. Returns `None` if no
    /// live row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateArticle,
    ) -> Result<Option<Article>, sqlx::Error> {
        let query = format!(
            "UPDATE articles SET
                title = COALESCE($2, title),
                category_id = CASE WHEN $3 THEN $4 ELSE category_id END,
                access = COALESCE($5, access),
                current_version_id = COALESCE($6, current_version_id)
             WHERE id = $1 AND deleted = false
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Article>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(input.category_id.is_some())
            .bind(input.category_id.flatten())
            .bind(input.access)
            .bind(input.current_version_id)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete an article. Returns `true` if a row was marked deleted.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE articles SET deleted = true WHERE id = $1 AND deleted = false")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Restore a soft-deleted article. Returns `true` if a row was restored.
    pub async fn restore(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE articles SET deleted = false WHERE id = $1 AND deleted = true")
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Attach the fields derived from an article's versions.
    pub async fn detail(pool: &PgPool, article: Article) -> Result<ArticleDetail, sqlx::Error> {
        let history = Self::history(pool, article.id).await?;
        let versions = history.iter().map(|(id, _)| *id).collect();
        let authors = contributions_by_article(history.iter().map(|(_, by)| *by));
        let last_edited_by = article.current_version_id.and_then(|current| {
            history
                .iter()
                .find(|(id, _)| *id == current)
                .map(|(_, by)| *by)
        });
        Ok(ArticleDetail {
            slug: article.slug(),
            article,
            versions,
            authors,
            last_edited_by,
        })
    }

    /// `(version_id, created_by)` for an article's versions, oldest first.
    async fn history(pool: &PgPool, article_id: DbId) -> Result<Vec<(DbId, DbId)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, created_by FROM article_versions
             WHERE article_id = $1
             ORDER BY created_at, id",
        )
        .bind(article_id)
        .fetch_all(pool)
        .await
    }
}
