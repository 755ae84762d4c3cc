//! Course enrollment.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{CourseId, Timestamp, UserId};

/// Access right of a user to a course. Unique per (user, course).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub enrolled_at: Timestamp,
}

impl Enrollment {
    pub fn new(user_id: UserId, course_id: CourseId, enrolled_at: Timestamp) -> Self {
        Self {
            user_id,
            course_id,
            enrolled_at,
        }
    }
}

/// Whether a grant created the entitlement or found it already in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Created,
    AlreadyPresent,
}
