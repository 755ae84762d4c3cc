//! Instructor subscription.

use serde::{Deserialize, Serialize};

use super::InstructorPlan;
use crate::domain::foundation::{Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

/// Instructor plan held by a user. At most one per user.
///
/// Capability flags are copied from the plan's terms at grant time so that
/// later price-table changes do not silently alter a paid period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructorSubscription {
    pub user_id: UserId,
    pub plan: InstructorPlan,
    pub status: SubscriptionStatus,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub max_courses: Option<u32>,
    pub can_advertise: bool,
    pub updated_at: Timestamp,
}

impl InstructorSubscription {
    /// Builds an active subscription running `duration_days` from `now`.
    pub fn activate(
        user_id: UserId,
        plan: InstructorPlan,
        duration_days: i64,
        now: Timestamp,
    ) -> Self {
        let terms = plan.terms();
        Self {
            user_id,
            plan,
            status: SubscriptionStatus::Active,
            starts_at: now,
            ends_at: now.add_days(duration_days),
            max_courses: terms.max_courses,
            can_advertise: terms.can_advertise,
            updated_at: now,
        }
    }

    /// True while active and the paid period has not ended.
    pub fn is_active_at(&self, at: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && at <= self.ends_at
    }
}
