//! Category entity model and DTOs.

use revoltwiki_core::types::{DbId, Timestamp};
use revoltwiki_core::wiki::generate_slug;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `categories` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: DbId,
    pub title: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Category {
    pub fn slug(&self) -> String {
        generate_slug(&self.title)
    }
}

/// Category with its derived slug and the ids of its live articles.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryResponse {
    #[serde(flatten)]
    pub category: Category,
    pub slug: String,
    pub articles: Vec<DbId>,
}

impl CategoryResponse {
    pub fn new(category: Category, articles: Vec<DbId>) -> Self {
        let slug = category.slug();
        Self {
            category,
            slug,
            articles,
        }
    }
}

/// DTO for creating a new category.
#[derive(Debug, Deserialize)]
pub struct CreateCategory {
    pub title: String,
}

/// DTO for updating an existing category.
#[derive(Debug, Deserialize)]
pub struct UpdateCategory {
    pub title: Option<String>,
}
