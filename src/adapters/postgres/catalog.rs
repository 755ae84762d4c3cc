//! PostgreSQL course catalog and user directory.
//!
//! Both tables belong to the marketplace; this service reads course prices
//! and only ever writes a user's role.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::billing::Currency;
use crate::domain::entitlement::UserRole;
use crate::domain::foundation::{CourseId, DomainError, ErrorCode, UserId};
use crate::ports::{CourseCatalog, CourseListing, UserAccount, UserDirectory};

pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CourseRow {
    id: String,
    title: String,
    price: i64,
    currency: String,
    is_free: bool,
}

impl TryFrom<CourseRow> for CourseListing {
    type Error = DomainError;

    fn try_from(row: CourseRow) -> Result<Self, Self::Error> {
        Ok(CourseListing {
            id: CourseId::new(row.id)?,
            title: row.title,
            price: row.price,
            currency: row.currency.parse::<Currency>()?,
            is_free: row.is_free,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    name: String,
    role: String,
}

impl TryFrom<UserRow> for UserAccount {
    type Error = DomainError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(UserAccount {
            id: UserId::new(row.id)?,
            name: row.name,
            role: row.role.parse::<UserRole>()?,
        })
    }
}

#[async_trait]
impl CourseCatalog for PostgresCatalog {
    async fn find_course(&self, id: &CourseId) -> Result<Option<CourseListing>, DomainError> {
        let row: Option<CourseRow> = sqlx::query_as(
            "SELECT id, title, price, currency, is_free FROM courses WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load course", e))?;

        row.map(CourseListing::try_from).transpose()
    }
}

#[async_trait]
impl UserDirectory for PostgresCatalog {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserAccount>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as("SELECT id, name, role FROM users WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to load user", e))?;

        row.map(UserAccount::try_from).transpose()
    }

    async fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), DomainError> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to update role", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(ErrorCode::UserNotFound, "User not found")
                .with_detail("user_id", id.as_str()));
        }
        Ok(())
    }
}
