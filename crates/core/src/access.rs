//! Article access levels.
//!
//! An article's `access` column is a bitmask over three audiences. The flags
//! compose with `|`, and [`AccessLevel::permits`] is the single place that
//! decides whether a reader's roles satisfy a mask.

use std::fmt;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Roles of the member making a request. Anonymous callers have none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemberRoles {
    pub is_staff: bool,
    pub is_superuser: bool,
    pub is_active: bool,
}

impl MemberRoles {
    /// Roles of an unauthenticated caller.
    pub const ANONYMOUS: MemberRoles = MemberRoles {
        is_staff: false,
        is_superuser: false,
        is_active: false,
    };

    pub fn new(is_staff: bool, is_superuser: bool, is_active: bool) -> Self {
        Self {
            is_staff,
            is_superuser,
            is_active,
        }
    }

    /// Staff rights only count for active accounts.
    pub fn staff(&self) -> bool {
        self.is_active && self.is_staff
    }

    /// Superuser rights only count for active accounts.
    pub fn superuser(&self) -> bool {
        self.is_active && self.is_superuser
    }
}

/// A set of audiences allowed to read an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct AccessLevel(i16);

impl AccessLevel {
    pub const ALL: AccessLevel = AccessLevel(0b001);
    pub const STAFF: AccessLevel = AccessLevel(0b010);
    pub const SUPERUSER: AccessLevel = AccessLevel(0b100);

    /// The masks an article may carry.
    pub const CHOICES: [AccessLevel; 4] = [
        Self::ALL,
        Self::STAFF,
        Self::SUPERUSER,
        AccessLevel(Self::STAFF.0 | Self::SUPERUSER.0),
    ];

    /// Raw bitmask as stored in the database.
    pub fn bits(self) -> i16 {
        self.0
    }

    /// Parse a stored or submitted bitmask, rejecting anything outside
    /// [`AccessLevel::CHOICES`].
    pub fn from_bits(bits: i16) -> Result<Self, CoreError> {
        let level = AccessLevel(bits);
        if Self::CHOICES.contains(&level) {
            Ok(level)
        } else {
            Err(CoreError::invalid_field(
                "access",
                format!(
                    "{bits} is not a valid access level. Valid levels: {}",
                    Self::CHOICES
                        .iter()
                        .map(|c| c.bits().to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ))
        }
    }

    pub fn contains(self, other: AccessLevel) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether a caller with `roles` may read content guarded by this mask.
    pub fn permits(self, roles: &MemberRoles) -> bool {
        self.contains(Self::ALL)
            || (self.contains(Self::STAFF) && roles.staff())
            || (self.contains(Self::SUPERUSER) && roles.superuser())
    }

    /// Every valid mask `roles` can read, for filtering list queries.
    pub fn visible_to(roles: &MemberRoles) -> Vec<i16> {
        Self::CHOICES
            .iter()
            .filter(|c| c.permits(roles))
            .map(|c| c.bits())
            .collect()
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0b001 => "All",
            0b010 => "Staff",
            0b100 => "Superuser",
            0b110 => "Staff or superuser",
            _ => "Unknown",
        }
    }
}

impl Default for AccessLevel {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitOr for AccessLevel {
    type Output = AccessLevel;

    fn bitor(self, rhs: AccessLevel) -> AccessLevel {
        AccessLevel(self.0 | rhs.0)
    }
}

impl TryFrom<i16> for AccessLevel {
    type Error = CoreError;

    fn try_from(bits: i16) -> Result<Self, Self::Error> {
        Self::from_bits(bits)
    }
}

impl From<AccessLevel> for i16 {
    fn from(level: AccessLevel) -> i16 {
        level.0
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
