//! In-memory entitlement store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::entitlement::{
    Enrollment, GrantOutcome, InstructorProfile, InstructorSubscription,
};
use crate::domain::foundation::{CourseId, DomainError, UserId};
use crate::ports::EntitlementStore;

#[derive(Default)]
pub struct InMemoryEntitlementStore {
    enrollments: RwLock<Vec<Enrollment>>,
    subscriptions: RwLock<HashMap<UserId, InstructorSubscription>>,
    profiles: RwLock<HashMap<UserId, InstructorProfile>>,
}

impl InMemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    /// Rows stored for one (user, course) pair.
    pub fn enrollment_count(&self, user_id: &UserId, course_id: &CourseId) -> usize {
        self.enrollments
            .read()
            .expect("InMemoryEntitlementStore: enrollments lock poisoned")
            .iter()
            .filter(|e| &e.user_id == user_id && &e.course_id == course_id)
            .count()
    }

    pub fn total_enrollments(&self) -> usize {
        self.enrollments
            .read()
            .expect("InMemoryEntitlementStore: enrollments lock poisoned")
            .len()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .read()
            .expect("InMemoryEntitlementStore: subscriptions lock poisoned")
            .len()
    }

    /// Stores a profile directly, e.g. one the instructor already edited.
    pub fn insert_profile(&self, profile: InstructorProfile) {
        self.profiles
            .write()
            .expect("InMemoryEntitlementStore: profiles lock poisoned")
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl EntitlementStore for InMemoryEntitlementStore {
    async fn upsert_enrollment(
        &self,
        enrollment: &Enrollment,
    ) -> Result<GrantOutcome, DomainError> {
        let mut enrollments = self
            .enrollments
            .write()
            .expect("InMemoryEntitlementStore: enrollments lock poisoned");
        let exists = enrollments
            .iter()
            .any(|e| e.user_id == enrollment.user_id && e.course_id == enrollment.course_id);
        if exists {
            return Ok(GrantOutcome::AlreadyPresent);
        }
        enrollments.push(enrollment.clone());
        Ok(GrantOutcome::Created)
    }

    async fn is_enrolled(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<bool, DomainError> {
        Ok(self.enrollment_count(user_id, course_id) > 0)
    }

    async fn upsert_subscription(
        &self,
        subscription: &InstructorSubscription,
    ) -> Result<(), DomainError> {
        self.subscriptions
            .write()
            .expect("InMemoryEntitlementStore: subscriptions lock poisoned")
            .insert(subscription.user_id.clone(), subscription.clone());
        Ok(())
    }

    async fn find_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<InstructorSubscription>, DomainError> {
        Ok(self
            .subscriptions
            .read()
            .expect("InMemoryEntitlementStore: subscriptions lock poisoned")
            .get(user_id)
            .cloned())
    }

    async fn create_profile_if_absent(
        &self,
        profile: &InstructorProfile,
    ) -> Result<GrantOutcome, DomainError> {
        let mut profiles = self
            .profiles
            .write()
            .expect("InMemoryEntitlementStore: profiles lock poisoned");
        if profiles.contains_key(&profile.user_id) {
            return Ok(GrantOutcome::AlreadyPresent);
        }
        profiles.insert(profile.user_id.clone(), profile.clone());
        Ok(GrantOutcome::Created)
    }

    async fn find_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<InstructorProfile>, DomainError> {
        Ok(self
            .profiles
            .read()
            .expect("InMemoryEntitlementStore: profiles lock poisoned")
            .get(user_id)
            .cloned())
    }
}
