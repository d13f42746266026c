//! Per-request user context and the capability check.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orderflow_core::UserId;

use crate::roles::{Capability, Role};

/// Resolved caller identity supplied by the session layer.
///
/// Construction is decoupled from transport: the HTTP layer derives this from
/// verified claims, tests build it directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: UserId,
    pub role: Role,
}

impl UserContext {
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn customer(user_id: UserId) -> Self {
        Self::new(user_id, Role::Customer)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing capability '{0:?}'")]
    Forbidden(Capability),
}

/// Authorize a caller for a capability.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(ctx: &UserContext, capability: Capability) -> Result<(), AuthzError> {
    if ctx.role.allows(capability) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(capability))
    }
}
