//! Instructor role and public profile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{Timestamp, UserId, ValidationError};

const SLUG_SUFFIX_LEN: usize = 6;

/// Platform role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Instructor,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Instructor => "instructor",
            UserRole::Admin => "admin",
        }
    }

    /// Role after buying an instructor plan. Admins keep their role.
    pub fn promoted_to_instructor(self) -> Self {
        match self {
            UserRole::Admin => UserRole::Admin,
            UserRole::Student | UserRole::Instructor => UserRole::Instructor,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "instructor" => Ok(UserRole::Instructor),
            "admin" => Ok(UserRole::Admin),
            other => Err(ValidationError::invalid_format(
                "role",
                format!("unknown role '{}'", other),
            )),
        }
    }
}

/// Public instructor page. Created once, then owned by the instructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorProfile {
    pub user_id: UserId,
    pub slug: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub created_at: Timestamp,
}

impl InstructorProfile {
    /// Creates a fresh profile with a slug derived from name and user id.
    pub fn create(user_id: UserId, display_name: impl Into<String>, now: Timestamp) -> Self {
        let display_name = display_name.into();
        let slug = profile_slug(&display_name, &user_id);
        Self {
            user_id,
            slug,
            display_name,
            bio: None,
            created_at: now,
        }
    }
}

/// Generates `<name-slug>-<id suffix>`.
///
/// The name part keeps ASCII letters and digits, lowercased, with every
/// other run collapsed into one `-`. The suffix is the last six
/// alphanumeric characters of the user id, which keeps slugs unique for
/// users sharing a name.
pub fn profile_slug(name: &str, user_id: &UserId) -> String {
    let mut base = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            base.push(c.to_ascii_lowercase());
        } else if !base.is_empty() && !base.ends_with('-') {
            base.push('-');
        }
    }
    let base = base.trim_end_matches('-');
    let base = if base.is_empty() { "instructor" } else { base };

    let id_chars: Vec<char> = user_id
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let suffix: String = id_chars[id_chars.len().saturating_sub(SLUG_SUFFIX_LEN)..]
        .iter()
        .collect();

    if suffix.is_empty() {
        base.to_string()
    } else {
        format!("{}-{}", base, suffix)
    }
}
