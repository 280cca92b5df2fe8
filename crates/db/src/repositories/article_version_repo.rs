//! Repository for the `article_versions` table.
//!
//! Versions are immutable. Creating one computes its diff against the
//! article's latest version and moves the article's current-version pointer,
//! all inside one transaction holding a row lock on the article.

use revoltwiki_core::diff::compute_version_diff;
use revoltwiki_core::types::DbId;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::article_version::{ArticleVersion, CreateArticleVersion};

/// Column list for version queries, joined with the parent article as `a`.
const COLUMNS: &str =
    "v.id, v.article_id, v.content, v.diff, v.created_by, v.created_at, a.access";

/// Provides create and read operations for article versions.
pub struct ArticleVersionRepo;

impl ArticleVersionRepo {
    /// Save new content for an article.
    ///
    /// Returns `None` if the article does not exist. Nothing is written
    /// unless the version insert and the pointer update both succeed.
    pub async fn create(
        pool: &PgPool,
        input: &CreateArticleVersion,
        created_by: DbId,
    ) -> Result<Option<ArticleVersion>, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let version =
            Self::create_inner(&mut tx, input.article_id, &input.content, created_by).await?;
        if version.is_some() {
            tx.commit().await?;
        }
        Ok(version)
    }

    /// Version write shared with article creation.
    pub(crate) async fn create_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        article_id: DbId,
        content: &str,
        created_by: DbId,
    ) -> Result<Option<ArticleVersion>, sqlx::Error> {
        // Serializes writers of the same article until commit.
        let access: Option<(i16,)> =
            sqlx::query_as("SELECT access FROM articles WHERE id = $1 FOR UPDATE")
                .bind(article_id)
                .fetch_optional(&mut **tx)
                .await?;
        let Some((access,)) = access else {
            return Ok(None);
        };

        let previous = Self::latest_content(&mut **tx, article_id).await?;
        let first = previous.is_none();

        // Large rewrites take a while to diff; keep them off the async workers.
        let new_content = content.to_owned();
        let diff = tokio::task::spawn_blocking(move || {
            compute_version_diff(previous.as_deref(), &new_content)
        })
        .await
        .map_err(|e| sqlx::Error::Protocol(format!("Diff task failed: {e}")))?;

        // clock_timestamp() rather than NOW(): a transaction that waited on the
        // lock must still sort after the one it waited for.
        let version = sqlx::query_as::<_, ArticleVersion>(
            "INSERT INTO article_versions (article_id, content, diff, created_by, created_at)
             VALUES ($1, $2, $3, $4, clock_timestamp())
             RETURNING id, article_id, content, diff, created_by, created_at,
                       $5::SMALLINT AS access",
        )
        .bind(article_id)
        .bind(content)
        .bind(Json(&diff))
        .bind(created_by)
        .bind(access)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query("UPDATE articles SET current_version_id = $2 WHERE id = $1")
            .bind(article_id)
            .bind(version.id)
            .execute(&mut **tx)
            .await?;

        tracing::debug!(
            article_id,
            version_id = version.id,
            spans = diff.len(),
            first,
            "Stored article version"
        );
        Ok(Some(version))
    }

    /// Find a version by ID.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ArticleVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM article_versions v
             JOIN articles a ON a.id = v.article_id
             WHERE v.id = $1"
        );
        sqlx::query_as::<_, ArticleVersion>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List versions of live articles the caller may read, newest first.
    pub async fn list(
        pool: &PgPool,
        visible_access: &[i16],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ArticleVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM article_versions v
             JOIN articles a ON a.id = v.article_id
             WHERE a.deleted = false AND a.access = ANY($1)
             ORDER BY v.created_at DESC, v.id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, ArticleVersion>(&query)
            .bind(visible_access)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// List all versions of an article, oldest first.
    pub async fn list_by_article(
        pool: &PgPool,
        article_id: DbId,
    ) -> Result<Vec<ArticleVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM article_versions v
             JOIN articles a ON a.id = v.article_id
             WHERE v.article_id = $1
             ORDER BY v.created_at, v.id"
        );
        sqlx::query_as::<_, ArticleVersion>(&query)
            .bind(article_id)
            .fetch_all(pool)
            .await
    }

    /// `(version_id, article_id)` for every version a member created, oldest first.
    pub async fn contributions(
        pool: &PgPool,
        member_id: DbId,
    ) -> Result<Vec<(DbId, DbId)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, article_id FROM article_versions
             WHERE created_by = $1
             ORDER BY created_at, id",
        )
        .bind(member_id)
        .fetch_all(pool)
        .await
    }

    /// Content of an article's latest version, if it has any.
    pub async fn latest_content<'e, E>(
        executor: E,
        article_id: DbId,
    ) -> Result<Option<String>, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT content FROM article_versions
             WHERE article_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
        )
        .bind(article_id)
        .fetch_optional(executor)
        .await?;
        Ok(row.map(|(c,)| c))
    }
}
