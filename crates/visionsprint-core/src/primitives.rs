//! # Hackathon Primitives
//!
//! Hardcoded limits and format constants.
//!
//! These are compiled into the binary and are immutable at runtime.

use crate::VisionSprintError;

/// Maximum number of votes a user may hold at the same time.
pub const MAX_VOTES_PER_USER: usize = 3;

/// Maximum number of ideas a user may have joined at the same time.
pub const MAX_JOINS_PER_USER: usize = 1;

/// Maximum number of members in a team.
pub const MAX_TEAM_SIZE: usize = 5;

/// Minimum number of members in a team.
pub const MIN_TEAM_SIZE: usize = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of an idea title, in bytes.
pub const MAX_TITLE_LENGTH: usize = 120;

/// Maximum length of an idea description, in bytes.
pub const MAX_DESCRIPTION_LENGTH: usize = 4000;

/// Maximum length of a team name, in bytes.
pub const MAX_TEAM_NAME_LENGTH: usize = 80;

/// Maximum length of a display name, in bytes.
pub const MAX_USER_NAME_LENGTH: usize = 120;

/// Maximum length of an email address, in bytes.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum length of a submission description, in bytes.
pub const MAX_SUBMISSION_DESCRIPTION_LENGTH: usize = 2000;

/// Maximum length of a video URL, in bytes.
pub const MAX_URL_LENGTH: usize = 2048;

// =============================================================================
// SNAPSHOT FORMAT
// =============================================================================

/// Magic bytes for the snapshot export format.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"VSPX";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot layout.
pub const SNAPSHOT_VERSION: u8 = 2;

/// Maximum number of records accepted on import, summed over every kind.
pub const MAX_IMPORT_RECORDS: u64 = 1_000_000;

/// Maximum payload accepted on import (64 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 64 * 1024 * 1024;

// =============================================================================
// VALIDATION HELPERS
// =============================================================================

/// Trim `value` and check it against `[min, max]` bytes.
pub fn bounded_text(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, VisionSprintError> {
    let trimmed = value.trim();
    if trimmed.len() < min {
        return Err(VisionSprintError::InvalidInput(if min == 1 {
            format!("{} must not be empty", field)
        } else {
            format!("{} must be at least {} bytes", field, min)
        }));
    }
    if trimmed.len() > max {
        return Err(VisionSprintError::InvalidInput(format!(
            "{} length {} exceeds maximum {} bytes",
            field,
            trimmed.len(),
            max
        )));
    }
    Ok(trimmed.to_string())
}

/// Normalize and minimally validate an email address.
pub fn normalize_email(email: &str) -> Result<String, VisionSprintError> {
    let email = bounded_text("email", email, 3, MAX_EMAIL_LENGTH)?.to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(VisionSprintError::InvalidInput(format!(
            "'{}' is not an email address",
            email
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_text_trims() {
        let out = bounded_text("title", "  Hello  ", 1, 10).expect("valid");
        assert_eq!(out, "Hello");
    }

    #[test]
    fn bounded_text_rejects_blank() {
        let err = bounded_text("title", "   ", 1, 10).expect_err("blank");
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn bounded_text_rejects_long() {
        let long = "x".repeat(11);
        assert!(bounded_text("title", &long, 1, 10).is_err());
    }

    #[test]
    fn email_is_lowercased() {
        assert_eq!(
            normalize_email(" Ada@Example.COM ").expect("valid"),
            "ada@example.com"
        );
    }

    #[test]
    fn email_requires_single_at() {
        assert!(normalize_email("nobody").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@b@c").is_err());
    }
}
