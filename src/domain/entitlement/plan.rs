//! Instructor plan tiers and their static terms.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Instructor subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstructorPlan {
    Basic,
    Pro,
    Premium,
}

impl InstructorPlan {
    pub const ALL: [InstructorPlan; 3] = [Self::Basic, Self::Pro, Self::Premium];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstructorPlan::Basic => "basic",
            InstructorPlan::Pro => "pro",
            InstructorPlan::Premium => "premium",
        }
    }

    /// Returns the display name for this plan.
    pub fn display_name(&self) -> &'static str {
        match self {
            InstructorPlan::Basic => "Basic",
            InstructorPlan::Pro => "Pro",
            InstructorPlan::Premium => "Premium",
        }
    }

    pub fn terms(&self) -> PlanTerms {
        PlanTerms::for_plan(*self)
    }
}

impl fmt::Display for InstructorPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstructorPlan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(InstructorPlan::Basic),
            "pro" => Ok(InstructorPlan::Pro),
            "premium" => Ok(InstructorPlan::Premium),
            other => Err(ValidationError::invalid_format(
                "plan",
                format!("unknown instructor plan '{}'", other),
            )),
        }
    }
}

/// Price, period and capabilities of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTerms {
    pub plan: InstructorPlan,
    /// Whole UZS per period.
    pub price_uzs: i64,
    pub duration_days: i64,
    /// Published course quota. None = unlimited.
    pub max_courses: Option<u32>,
    pub can_advertise: bool,
}

impl PlanTerms {
    /// Get the terms for a specific plan.
    ///
    /// | Plan | Price (UZS) | Days | Courses | Advertising |
    /// |------|-------------|------|---------|-------------|
    /// | Basic | 99 000 | 30 | 5 | No |
    /// | Pro | 249 000 | 30 | 20 | Yes |
    /// | Premium | 499 000 | 30 | Unlimited | Yes |
    pub fn for_plan(plan: InstructorPlan) -> Self {
        match plan {
            InstructorPlan::Basic => Self {
                plan,
                price_uzs: 99_000,
                duration_days: 30,
                max_courses: Some(5),
                can_advertise: false,
            },
            InstructorPlan::Pro => Self {
                plan,
                price_uzs: 249_000,
                duration_days: 30,
                max_courses: Some(20),
                can_advertise: true,
            },
            InstructorPlan::Premium => Self {
                plan,
                price_uzs: 499_000,
                duration_days: 30,
                max_courses: None,
                can_advertise: true,
            },
        }
    }

    /// Check if the course quota has been reached.
    ///
    /// Returns false if unlimited or under limit.
    pub fn course_limit_reached(&self, published_courses: u32) -> bool {
        self.max_courses
            .map(|max| published_courses >= max)
            .unwrap_or(false)
    }
}
