//! Closed role set and capability mapping.
//!
//! Roles are a fixed enum, not free-form flag names; capability checks go
//! through [`Role::allows`] so the full policy is visible in one table.

use serde::{Deserialize, Serialize};

/// Role assigned to a user account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular shopper: owns a cart, places and views own orders.
    Customer,
    /// Back-office support: read access to any order.
    Support,
    /// Administrator: catalog management plus everything Support can do.
    Admin,
}

/// A capability gated beyond plain ownership checks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Create/update products and variants.
    ManageCatalog,
    /// Read orders regardless of ownership.
    ViewAnyOrder,
}

impl Role {
    /// Full capability table. Ownership-scoped operations (own cart, own
    /// orders) are not capabilities; every authenticated user has them.
    pub fn allows(self, capability: Capability) -> bool {
        match (self, capability) {
            (Role::Admin, _) => true,
            (Role::Support, Capability::ViewAnyOrder) => true,
            (Role::Support, Capability::ManageCatalog) => false,
            (Role::Customer, _) => false,
        }
    }
}
