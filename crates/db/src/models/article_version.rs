//! Article version model and DTOs.

use revoltwiki_core::access::AccessLevel;
use revoltwiki_core::diff::{self, DiffSpan, DiffStats};
use revoltwiki_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// A row from `article_versions`, joined with its article's access mask.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ArticleVersion {
    pub id: DbId,
    pub article_id: DbId,
    pub content: String,
    /// Spans turning the previous version's content into `content`.
    pub diff: Json<Vec<DiffSpan>>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    /// Access mask of the parent article.
    pub access: i16,
}

impl ArticleVersion {
    pub fn access_level(&self) -> AccessLevel {
        AccessLevel::from_bits(self.access).unwrap_or(AccessLevel::SUPERUSER)
    }

    pub fn diff_stats(&self) -> DiffStats {
        diff::stats(&self.diff.0)
    }
}

/// DTO for creating a new version.
#[derive(Debug, Deserialize)]
pub struct CreateArticleVersion {
    pub article_id: DbId,
    #[serde(default)]
    pub content: String,
}

/// The diff of one version against its predecessor.
#[derive(Debug, Serialize)]
pub struct VersionDiffResponse {
    pub version_id: DbId,
    pub article_id: DbId,
    pub spans: Vec<DiffSpan>,
    pub stats: DiffStats,
}

impl From<&ArticleVersion> for VersionDiffResponse {
    fn from(v: &ArticleVersion) -> Self {
        Self {
            version_id: v.id,
            article_id: v.article_id,
            spans: v.diff.0.clone(),
            stats: v.diff_stats(),
        }
    }
}
