//! PostgreSQL implementation of EntitlementStore.
//!
//! Every write is an `INSERT … ON CONFLICT`, so grants can be repeated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::entitlement::{
    Enrollment, GrantOutcome, InstructorPlan, InstructorProfile, InstructorSubscription,
    SubscriptionStatus,
};
use crate::domain::foundation::{CourseId, DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::EntitlementStore;

pub struct PostgresEntitlementStore {
    pool: PgPool,
}

impl PostgresEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    user_id: String,
    plan: String,
    status: String,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    max_courses: Option<i32>,
    can_advertise: bool,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for InstructorSubscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = match row.status.as_str() {
            "active" => SubscriptionStatus::Active,
            "expired" => SubscriptionStatus::Expired,
            other => {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid subscription status: {}", other),
                ))
            }
        };
        let max_courses = row
            .max_courses
            .map(u32::try_from)
            .transpose()
            .map_err(|e| DomainError::database("Invalid max_courses", e))?;

        Ok(InstructorSubscription {
            user_id: UserId::new(row.user_id)?,
            plan: row.plan.parse::<InstructorPlan>()?,
            status,
            starts_at: Timestamp::from_datetime(row.starts_at),
            ends_at: Timestamp::from_datetime(row.ends_at),
            max_courses,
            can_advertise: row.can_advertise,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    slug: String,
    display_name: String,
    bio: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for InstructorProfile {
    type Error = DomainError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(InstructorProfile {
            user_id: UserId::new(row.user_id)?,
            slug: row.slug,
            display_name: row.display_name,
            bio: row.bio,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

fn outcome(rows_affected: u64) -> GrantOutcome {
    if rows_affected == 0 {
        GrantOutcome::AlreadyPresent
    } else {
        GrantOutcome::Created
    }
}

#[async_trait]
impl EntitlementStore for PostgresEntitlementStore {
    async fn upsert_enrollment(
        &self,
        enrollment: &Enrollment,
    ) -> Result<GrantOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO enrollments (user_id, course_id, enrolled_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, course_id) DO NOTHING
            "#,
        )
        .bind(enrollment.user_id.as_str())
        .bind(enrollment.course_id.as_str())
        .bind(enrollment.enrolled_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save enrollment", e))?;

        Ok(outcome(result.rows_affected()))
    }

    async fn is_enrolled(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM enrollments WHERE user_id = $1 AND course_id = $2)",
        )
        .bind(user_id.as_str())
        .bind(course_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to check enrollment", e))?;

        Ok(exists)
    }

    async fn upsert_subscription(
        &self,
        subscription: &InstructorSubscription,
    ) -> Result<(), DomainError> {
        let max_courses = subscription
            .max_courses
            .map(i32::try_from)
            .transpose()
            .map_err(|e| DomainError::database("max_courses out of range", e))?;

        sqlx::query(
            r#"
            INSERT INTO instructor_subscriptions (
                user_id, plan, status, starts_at, ends_at, max_courses, can_advertise, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id) DO UPDATE SET
                plan = EXCLUDED.plan,
                status = EXCLUDED.status,
                starts_at = EXCLUDED.starts_at,
                ends_at = EXCLUDED.ends_at,
                max_courses = EXCLUDED.max_courses,
                can_advertise = EXCLUDED.can_advertise,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(subscription.user_id.as_str())
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.starts_at.as_datetime())
        .bind(subscription.ends_at.as_datetime())
        .bind(max_courses)
        .bind(subscription.can_advertise)
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save subscription", e))?;

        Ok(())
    }

    async fn find_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<InstructorSubscription>, DomainError> {
        let row: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT user_id, plan, status, starts_at, ends_at, max_courses, can_advertise, updated_at
            FROM instructor_subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load subscription", e))?;

        row.map(InstructorSubscription::try_from).transpose()
    }

    async fn create_profile_if_absent(
        &self,
        profile: &InstructorProfile,
    ) -> Result<GrantOutcome, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO instructor_profiles (user_id, slug, display_name, bio, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(profile.user_id.as_str())
        .bind(&profile.slug)
        .bind(&profile.display_name)
        .bind(&profile.bio)
        .bind(profile.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("instructor_profiles_slug_key") {
                    return DomainError::new(ErrorCode::Conflict, "Profile slug already taken")
                        .with_detail("slug", profile.slug.clone());
                }
            }
            DomainError::database("Failed to create profile", e)
        })?;

        Ok(outcome(result.rows_affected()))
    }

    async fn find_profile(
        &self,
        user_id: &UserId,
    ) -> Result<Option<InstructorProfile>, DomainError> {
        let row: Option<ProfileRow> = sqlx::query_as(
            r#"
            SELECT user_id, slug, display_name, bio, created_at
            FROM instructor_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load profile", e))?;

        row.map(InstructorProfile::try_from).transpose()
    }
}
