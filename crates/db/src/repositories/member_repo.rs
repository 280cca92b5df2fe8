//! Repository for the `members` table.

use revoltwiki_core::member::SENTINEL_USERNAME;
use revoltwiki_core::types::DbId;
use sqlx::PgPool;

use crate::models::member::{CreateMember, Member, UpdateMember};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, \
    is_staff, is_superuser, is_active, last_login_at, date_joined, created_at, updated_at";

/// Provides CRUD operations for members.
pub struct MemberRepo;

impl MemberRepo {
    /// Insert a new member, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateMember) -> Result<Member, sqlx::Error> {
        let query = format!(
            "INSERT INTO members
                (username, email, password_hash, first_name, last_name, is_staff, is_superuser)
             VALUES ($1, $2, $3, COALESCE($4, ''), COALESCE($5, ''),
                     COALESCE($6, false), COALESCE($7, false))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.is_staff)
            .bind(input.is_superuser)
            .fetch_one(pool)
            .await
    }

    /// Find a member by internal ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Member>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM members WHERE id = $1");
        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a member by username (case-sensitive).
    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<Member>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM members WHERE username = $1");
        sqlx::query_as::<_, Member>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// List members, most recently joined first.
    pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<Member>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM members
             ORDER BY date_joined DESC, id DESC
             LIMIT $1 OFFSET $2"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update a member. Only non-`None` fields in `input` are applied.
    ///
    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMember,
    ) -> Result<Option<Member>, sqlx::Error> {
        let query = format!(
            "UPDATE members SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                first_name = COALESCE($4, first_name),
                last_name = COALESCE($5, last_name),
                is_staff = COALESCE($6, is_staff),
                is_superuser = COALESCE($7, is_superuser),
                is_active = COALESCE($8, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Member>(&query)
            .bind(id)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.first_name)
            .bind(&input.last_name)
            .bind(input.is_staff)
            .bind(input.is_superuser)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }

    /// Update a member's password hash. Returns `true` if the row was updated.
    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE members SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set `last_login_at` to now.
    pub async fn record_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE members SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Return the sentinel member's id, creating the row if it is missing.
    pub async fn ensure_sentinel(pool: &PgPool) -> Result<DbId, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let id = Self::ensure_sentinel_inner(&mut tx).await?;
        tx.commit().await?;
        Ok(id)
    }

    /// Delete a member, handing their articles and versions to the sentinel.
    ///
    /// Reassignment and deletion happen in one transaction. Returns `false`
    /// if the member does not exist or is the sentinel itself.
    pub async fn delete_with_sentinel(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let sentinel_id = Self::ensure_sentinel_inner(&mut tx).await?;
        if id == sentinel_id {
            return Ok(false);
        }

        let articles = sqlx::query("UPDATE articles SET created_by = $2 WHERE created_by = $1")
            .bind(id)
            .bind(sentinel_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let versions =
            sqlx::query("UPDATE article_versions SET created_by = $2 WHERE created_by = $1")
                .bind(id)
                .bind(sentinel_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        let deleted = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        tx.commit().await?;
        if deleted {
            tracing::debug!(
                member_id = id,
                sentinel_id,
                articles,
                versions,
                "Reassigned contributions to sentinel"
            );
        }
        Ok(deleted)
    }

    async fn ensure_sentinel_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query(
            "INSERT INTO members (username, email, password_hash, is_active)
             VALUES ($1, $2, '!', false)
             ON CONFLICT ON CONSTRAINT uq_members_username DO NOTHING",
        )
        .bind(SENTINEL_USERNAME)
        .bind(format!("{SENTINEL_USERNAME}@revoltwiki.invalid"))
        .execute(&mut **tx)
        .await?;

        let (id,): (DbId,) = sqlx::query_as("SELECT id FROM members WHERE username = $1")
            .bind(SENTINEL_USERNAME)
            .fetch_one(&mut **tx)
            .await?;
        Ok(id)
    }
}
