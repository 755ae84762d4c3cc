//! Entitlement persistence port.
//!
//! Every write is an upsert so that granting the same entitlement twice
//! leaves exactly one row behind.

use async_trait::async_trait;

use crate::domain::entitlement::{
    Enrollment, GrantOutcome, InstructorProfile, InstructorSubscription,
};
use crate::domain::foundation::{CourseId, DomainError, UserId};

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    /// Inserts the enrollment unless the (user, course) pair already exists.
    async fn upsert_enrollment(&self, enrollment: &Enrollment)
        -> Result<GrantOutcome, DomainError>;

    async fn is_enrolled(&self, user_id: &UserId, course_id: &CourseId)
        -> Result<bool, DomainError>;

    /// Inserts or overwrites the user's single subscription row.
    async fn upsert_subscription(
        &self,
        subscription: &InstructorSubscription,
    ) -> Result<(), DomainError>;

    async fn find_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<InstructorSubscription>, DomainError>;

    /// Inserts the profile only if the user has none; never overwrites.
    async fn create_profile_if_absent(
        &self,
        profile: &InstructorProfile,
    ) -> Result<GrantOutcome, DomainError>;

    async fn find_profile(&self, user_id: &UserId)
        -> Result<Option<InstructorProfile>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entitlement_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn EntitlementStore) {}
    }
}
