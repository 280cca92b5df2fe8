//! Member entity model and DTOs.

use revoltwiki_core::access::MemberRoles;
use revoltwiki_core::member::{full_name, short_name, SENTINEL_USERNAME};
use revoltwiki_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full member row from the `members` table.
///
/// Contains the password hash. Never serialize this directly; use
/// [`MemberResponse`] for external output.
#[derive(Debug, Clone, FromRow)]
pub struct Member {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub date_joined: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Member {
    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }

    pub fn short_name(&self) -> String {
        short_name(&self.first_name)
    }

    pub fn roles(&self) -> MemberRoles {
        MemberRoles::new(self.is_staff, self.is_superuser, self.is_active)
    }

    pub fn is_sentinel(&self) -> bool {
        self.username == SENTINEL_USERNAME
    }
}

/// Safe member representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct MemberResponse {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub short_name: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
    pub last_login_at: Option<Timestamp>,
    pub date_joined: Timestamp,
}

impl From<&Member> for MemberResponse {
    fn from(m: &Member) -> Self {
        Self {
            id: m.id,
            username: m.username.clone(),
            email: m.email.clone(),
            first_name: m.first_name.clone(),
            last_name: m.last_name.clone(),
            full_name: m.full_name(),
            short_name: m.short_name(),
            is_staff: m.is_staff,
            is_superuser: m.is_superuser,
            is_active: m.is_active,
            last_login_at: m.last_login_at,
            date_joined: m.date_joined,
        }
    }
}

/// Member detail including what they have written.
#[derive(Debug, Clone, Serialize)]
pub struct MemberDetail {
    #[serde(flatten)]
    pub member: MemberResponse,
    /// Every version the member created, oldest first.
    pub contributions_by_version: Vec<DbId>,
    /// Distinct articles the member contributed to, in first-contribution order.
    pub contributions_by_article: Vec<DbId>,
}

/// DTO for creating a new member. The password is hashed before it gets here.
#[derive(Debug, Deserialize)]
pub struct CreateMember {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
}

/// DTO for updating an existing member. All fields are optional.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMember {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub is_active: Option<bool>,
}
