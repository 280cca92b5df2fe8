//! Wiki validation and slug generation.
//!
//! Shared by the repository and HTTP layers so that every write is checked
//! the same way before it reaches the database.

use validator::ValidateEmail;

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Field limits
// ---------------------------------------------------------------------------

pub const MAX_TITLE_LEN: usize = 128;
pub const MAX_CONTENT_LEN: usize = 100_000;
pub const MAX_USERNAME_LEN: usize = 40;
pub const MAX_NAME_LEN: usize = 30;
pub const MAX_EMAIL_LEN: usize = 254;

// ---------------------------------------------------------------------------
// Slug generation
// ---------------------------------------------------------------------------

/// Generate a URL slug from a title.
///
/// Unicode letters and digits survive, so non-Latin titles keep a readable
/// slug. Punctuation is dropped, runs of whitespace and hyphens become a
/// single hyphen, and leading/trailing hyphens and underscores are trimmed.
pub fn generate_slug(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();

    let mut result = String::with_capacity(kept.len());
    let mut in_separator = false;
    for c in kept.trim().chars() {
        if c == '-' || c.is_whitespace() {
            if !in_separator {
                result.push('-');
            }
            in_separator = true;
        } else {
            result.push(c);
            in_separator = false;
        }
    }

    result.trim_matches(|c| c == '-' || c == '_').to_string()
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn require_non_blank(field: &'static str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::invalid_field(field, "This field may not be blank"));
    }
    Ok(())
}

fn require_max_chars(field: &'static str, value: &str, max: usize) -> Result<(), CoreError> {
    if value.chars().count() > max {
        return Err(CoreError::invalid_field(
            field,
            format!("Ensure this field has no more than {max} characters"),
        ));
    }
    Ok(())
}

/// Validate an article or category title (non-empty, <= 128 chars).
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    require_non_blank("title", title)?;
    require_max_chars("title", title, MAX_TITLE_LEN)
}

/// Validate version content (<= 100 000 chars). Empty content is allowed.
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    require_max_chars("content", content, MAX_CONTENT_LEN)
}

/// Validate a username (non-empty, <= 40 chars, no whitespace).
pub fn validate_username(username: &str) -> Result<(), CoreError> {
    require_non_blank("username", username)?;
    require_max_chars("username", username, MAX_USERNAME_LEN)?;
    if username.chars().any(char::is_whitespace) {
        return Err(CoreError::invalid_field(
            "username",
            "Username must not contain whitespace",
        ));
    }
    Ok(())
}

/// Validate a first or last name (<= 30 chars, may be empty).
pub fn validate_name(field: &'static str, name: &str) -> Result<(), CoreError> {
    require_max_chars(field, name, MAX_NAME_LEN)
}

/// Validate an email address (<= 254 chars, syntactically valid).
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    require_max_chars("email", email, MAX_EMAIL_LEN)?;
    if !email.validate_email() {
        return Err(CoreError::invalid_field(
            "email",
            "Enter a valid email address",
        ));
    }
    Ok(())
}

/// An article's current version must be one of that article's own versions.
pub fn ensure_current_version_belongs(
    article_id: DbId,
    version_article_id: DbId,
) -> Result<(), CoreError> {
    if article_id != version_article_id {
        return Err(CoreError::invalid_field(
            "current_version",
            format!(
                "Version belongs to article {version_article_id}, not article {article_id}"
            ),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    // -- generate_slug -------------------------------------------------------

    #[test]
    fn slug_basic_title() {
        assert_eq!(generate_slug("Everyday cocktails"), "everyday-cocktails");
    }

    #[test]
    fn slug_drops_punctuation() {
        assert_eq!(generate_slug("Kahlua: a (short) history!"), "kahlua-a-short-history");
    }

    #[test]
    fn slug_collapses_separators() {
        assert_eq!(generate_slug("foo -- \t bar"), "foo-bar");
    }

    #[test]
    fn slug_trims_hyphens_and_underscores() {
        assert_eq!(generate_slug("  _-hello-_  "), "hello");
        assert_eq!(generate_slug("snake_case title"), "snake_case-title");
    }

    #[test]
    fn slug_keeps_unicode_letters() {
        assert_eq!(generate_slug("Café Olé"), "café-olé");
        assert_eq!(generate_slug("Москва мартини"), "москва-мартини");
    }

    #[test]
    fn slug_of_punctuation_only_is_empty() {
        assert_eq!(generate_slug("!?."), "");
    }

    // -- validate_title ------------------------------------------------------

    #[test]
    fn title_valid() {
        assert!(validate_title("White Russian").is_ok());
    }

    #[test]
    fn title_empty_rejected() {
        assert_matches!(
            validate_title("   "),
            Err(CoreError::InvalidField { field: "title", .. })
        );
    }

    #[test]
    fn title_limit_counts_characters() {
        assert!(validate_title(&"é".repeat(128)).is_ok());
        assert!(validate_title(&"a".repeat(129)).is_err());
    }

    // -- validate_content ----------------------------------------------------

    #[test]
    fn content_may_be_empty() {
        assert!(validate_content("").is_ok());
    }

    #[test]
    fn content_too_long_rejected() {
        let long = "x".repeat(100_001);
        assert_matches!(
            validate_content(&long),
            Err(CoreError::InvalidField { field: "content", .. })
        );
    }

    // -- member fields -------------------------------------------------------

    #[test]
    fn username_rules() {
        assert!(validate_username("thedude").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("the dude").is_err());
        assert!(validate_username(&"u".repeat(41)).is_err());
    }

    #[test]
    fn names_may_be_empty_but_bounded() {
        assert!(validate_name("first_name", "").is_ok());
        assert_matches!(
            validate_name("last_name", &"n".repeat(31)),
            Err(CoreError::InvalidField { field: "last_name", .. })
        );
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("dude@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("").is_err());
    }

    // -- current version -----------------------------------------------------

    #[test]
    fn current_version_must_belong_to_article() {
        assert!(ensure_current_version_belongs(3, 3).is_ok());
        assert_matches!(
            ensure_current_version_belongs(3, 4),
            Err(CoreError::InvalidField { field: "current_version", .. })
        );
    }
}
