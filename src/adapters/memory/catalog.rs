//! In-memory course catalog and user directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::billing::Currency;
use crate::domain::entitlement::UserRole;
use crate::domain::foundation::{CourseId, DomainError, ErrorCode, UserId};
use crate::ports::{CourseCatalog, CourseListing, UserAccount, UserDirectory};

#[derive(Default)]
pub struct InMemoryCatalog {
    courses: RwLock<HashMap<CourseId, CourseListing>>,
    users: RwLock<HashMap<UserId, UserAccount>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a paid course priced in UZS.
    pub fn add_course(&self, id: &str, title: &str, price: i64) -> CourseId {
        self.add_listing(id, title, price, Currency::Uzs, false)
    }

    pub fn add_free_course(&self, id: &str, title: &str) -> CourseId {
        self.add_listing(id, title, 0, Currency::Uzs, true)
    }

    pub fn add_listing(
        &self,
        id: &str,
        title: &str,
        price: i64,
        currency: Currency,
        is_free: bool,
    ) -> CourseId {
        let course_id = CourseId::new(id).expect("InMemoryCatalog: empty course id");
        self.courses
            .write()
            .expect("InMemoryCatalog: courses lock poisoned")
            .insert(
                course_id.clone(),
                CourseListing {
                    id: course_id.clone(),
                    title: title.to_string(),
                    price,
                    currency,
                    is_free,
                },
            );
        course_id
    }

    pub fn add_user(&self, id: &str, name: &str, role: UserRole) -> UserId {
        let user_id = UserId::new(id).expect("InMemoryCatalog: empty user id");
        self.users
            .write()
            .expect("InMemoryCatalog: users lock poisoned")
            .insert(
                user_id.clone(),
                UserAccount {
                    id: user_id.clone(),
                    name: name.to_string(),
                    role,
                },
            );
        user_id
    }

    pub fn role_of(&self, id: &UserId) -> Option<UserRole> {
        self.users
            .read()
            .expect("InMemoryCatalog: users lock poisoned")
            .get(id)
            .map(|u| u.role)
    }
}

#[async_trait]
impl CourseCatalog for InMemoryCatalog {
    async fn find_course(&self, id: &CourseId) -> Result<Option<CourseListing>, DomainError> {
        Ok(self
            .courses
            .read()
            .expect("InMemoryCatalog: courses lock poisoned")
            .get(id)
            .cloned())
    }
}

#[async_trait]
impl UserDirectory for InMemoryCatalog {
    async fn find_user(&self, id: &UserId) -> Result<Option<UserAccount>, DomainError> {
        Ok(self
            .users
            .read()
            .expect("InMemoryCatalog: users lock poisoned")
            .get(id)
            .cloned())
    }

    async fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), DomainError> {
        let mut users = self
            .users
            .write()
            .expect("InMemoryCatalog: users lock poisoned");
        let user = users.get_mut(id).ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, format!("User not found: {}", id))
        })?;
        user.role = role;
        Ok(())
    }
}
