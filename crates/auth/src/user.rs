//! User records and the lookup contract used by workers.

use serde::{Deserialize, Serialize};

use orderflow_core::{StoreError, UserId};

use crate::roles::Role;

/// A user account, as seen by the fulfillment pipeline.
///
/// Credentials (password hash, OTP secrets) are owned by the auth service and
/// never cross into this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
            email: None,
            phone: None,
            role: Role::Customer,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

/// Read-only user lookup.
///
/// The notification worker resolves recipients through this trait; it never
/// sees the auth service's own tables.
pub trait UserDirectory: Send + Sync {
    fn get_user(&self, user_id: UserId) -> Result<Option<User>, StoreError>;
}
