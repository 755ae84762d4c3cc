//! Entitlement domain - what a completed order grants.
//!
//! Course purchases grant an [`Enrollment`]; plan payments grant an
//! [`InstructorSubscription`] plus instructor role and profile.

mod enrollment;
mod plan;
mod profile;
mod subscription;

pub use enrollment::{Enrollment, GrantOutcome};
pub use plan::{InstructorPlan, PlanTerms};
pub use profile::{profile_slug, InstructorProfile, UserRole};
pub use subscription::{InstructorSubscription, SubscriptionStatus};
