//! Article entity model and DTOs.

use revoltwiki_core::access::AccessLevel;
use revoltwiki_core::types::{DbId, Timestamp};
use revoltwiki_core::wiki::generate_slug;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::nullable;

/// A row from the `articles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Article {
    pub id: DbId,
    pub title: String,
    pub category_id: Option<DbId>,
    pub current_version_id: Option<DbId>,
    /// Raw access bitmask; see [`Article::access_level`].
    pub access: i16,
    pub deleted: bool,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Article {
    pub fn slug(&self) -> String {
        generate_slug(&self.title)
    }

    /// Typed access level. An unrecognised mask fails closed to superusers.
    pub fn access_level(&self) -> AccessLevel {
        AccessLevel::from_bits(self.access).unwrap_or(AccessLevel::SUPERUSER)
    }
}

/// Article with everything derived from its versions.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetail {
    #[serde(flatten)]
    pub article: Article,
    pub slug: String,
    /// Version ids, oldest first.
    pub versions: Vec<DbId>,
    /// Distinct version authors in first-contribution order.
    pub authors: Vec<DbId>,
    /// Author of the current version.
    pub last_edited_by: Option<DbId>,
}

/// DTO for creating a new article.
#[derive(Debug, Deserialize)]
pub struct CreateArticle {
    pub title: String,
    pub category_id: Option<DbId>,
    /// Access bitmask; checked with [`AccessLevel::from_bits`] by the caller.
    pub access: Option<i16>,
    /// When present, saved as the article's first version.
    pub content: Option<String>,
}

/// DTO for updating an existing article. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateArticle {
    pub title: Option<String>,
    /// Absent leaves the category alone; `null` clears it.
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<DbId>>,
    pub access: Option<i16>,
    /// Must name one of this article's own versions.
    pub current_version_id: Option<DbId>,
}

/// Filters for listing articles.
#[derive(Debug, Clone)]
pub struct ArticleFilter {
    pub category_id: Option<DbId>,
    pub include_deleted: bool,
    /// Access masks the caller may read.
    pub visible_access: Vec<i16>,
    pub limit: i64,
    pub offset: i64,
}
