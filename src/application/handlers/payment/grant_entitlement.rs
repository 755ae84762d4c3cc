//! EntitlementGrantor - applies what a completed order paid for.
//!
//! Every operation is an upsert and safe to repeat. Provider adapters still
//! call it only when the ledger reports `Applied`.

use std::sync::Arc;
use thiserror::Error;

use crate::domain::billing::{Order, OrderSubject};
use crate::domain::entitlement::{
    Enrollment, GrantOutcome, InstructorPlan, InstructorProfile, InstructorSubscription,
};
use crate::domain::foundation::{CourseId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{EntitlementStore, UserDirectory};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Entitlement store error: {0}")]
    Infrastructure(String),
}

impl From<DomainError> for GrantError {
    fn from(err: DomainError) -> Self {
        GrantError::Infrastructure(err.to_string())
    }
}

pub struct EntitlementGrantor {
    store: Arc<dyn EntitlementStore>,
    users: Arc<dyn UserDirectory>,
}

impl EntitlementGrantor {
    pub fn new(store: Arc<dyn EntitlementStore>, users: Arc<dyn UserDirectory>) -> Self {
        Self { store, users }
    }

    /// Enrolls the user unless already enrolled.
    pub async fn grant_course_access(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<GrantOutcome, GrantError> {
        let enrollment = Enrollment::new(user_id.clone(), course_id.clone(), Timestamp::now());
        let outcome = self.store.upsert_enrollment(&enrollment).await?;

        tracing::info!(
            user_id = %user_id,
            course_id = %course_id,
            created = outcome == GrantOutcome::Created,
            "Course access granted"
        );
        Ok(outcome)
    }

    /// Activates `plan` for `duration_days` from now.
    ///
    /// Overwrites any previous subscription, promotes the user to
    /// instructor (admins stay admins) and creates a profile if the user
    /// has none. An existing profile is left untouched.
    pub async fn grant_instructor_plan(
        &self,
        user_id: &UserId,
        plan: InstructorPlan,
        duration_days: i64,
    ) -> Result<InstructorSubscription, GrantError> {
        let user = self
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| GrantError::UserNotFound(user_id.clone()))?;

        let now = Timestamp::now();
        let subscription =
            InstructorSubscription::activate(user_id.clone(), plan, duration_days, now);
        self.store.upsert_subscription(&subscription).await?;

        let promoted = user.role.promoted_to_instructor();
        if promoted != user.role {
            self.users
                .set_role(user_id, promoted)
                .await
                .map_err(|e| match e.code {
                    ErrorCode::UserNotFound => GrantError::UserNotFound(user_id.clone()),
                    _ => GrantError::from(e),
                })?;
        }

        let profile = InstructorProfile::create(user_id.clone(), user.name, now);
        let profile_outcome = self.store.create_profile_if_absent(&profile).await?;

        tracing::info!(
            user_id = %user_id,
            plan = %plan,
            ends_at = %subscription.ends_at.as_datetime(),
            profile_created = profile_outcome == GrantOutcome::Created,
            "Instructor plan granted"
        );
        Ok(subscription)
    }

    /// Grants whatever `subject` describes, using the plan's standard period.
    pub async fn grant_for(&self, subject: &OrderSubject) -> Result<(), GrantError> {
        match subject {
            OrderSubject::Course { user_id, course_id } => {
                self.grant_course_access(user_id, course_id).await?;
            }
            OrderSubject::Subscription { user_id, plan } => {
                self.grant_instructor_plan(user_id, *plan, plan.terms().duration_days)
                    .await?;
            }
        }
        Ok(())
    }

    /// Grants for an order the ledger has just completed.
    ///
    /// The payment has settled at this point and a provider retry would
    /// only see `AlreadyApplied`, so a failure is logged for manual
    /// reconciliation instead of being turned into a provider error.
    /// Returns whether the grant succeeded.
    pub async fn grant_after_payment(&self, order: &Order) -> bool {
        match self.grant_for(&order.subject).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    order_id = %order.id,
                    provider = %order.provider,
                    error = %e,
                    "Order completed but entitlement grant failed; needs reconciliation"
                );
                false
            }
        }
    }
}
