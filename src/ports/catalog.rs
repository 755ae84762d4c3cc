//! Read access to courses and users owned by the wider marketplace.

use async_trait::async_trait;

use crate::domain::billing::Currency;
use crate::domain::entitlement::UserRole;
use crate::domain::foundation::{CourseId, DomainError, UserId};

/// Price information of a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseListing {
    pub id: CourseId,
    pub title: String,
    /// Whole units of `currency`.
    pub price: i64,
    pub currency: Currency,
    pub is_free: bool,
}

impl CourseListing {
    /// Free courses and zero-priced courses cannot be bought.
    pub fn is_purchasable(&self) -> bool {
        !self.is_free && self.price > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub id: UserId,
    pub name: String,
    pub role: UserRole,
}

#[async_trait]
pub trait CourseCatalog: Send + Sync {
    async fn find_course(&self, id: &CourseId) -> Result<Option<CourseListing>, DomainError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserAccount>, DomainError>;

    /// Sets the user's role.
    ///
    /// # Errors
    ///
    /// `UserNotFound` if the user does not exist.
    async fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), DomainError>;
}
