//! Cart and cart-item records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{CartId, CartItemId, DomainError, Money, ProductId, UserId, VariantId};

/// Cart lifecycle.
///
/// Exactly one `Active` cart exists per user at a time (lookup-or-create).
/// `Completed` is entered exactly once, at checkout commit, and never reverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Active,
    Completed,
    Abandoned,
}

impl CartStatus {
    pub fn can_transition(self, to: CartStatus) -> bool {
        matches!(
            (self, to),
            (CartStatus::Active, CartStatus::Completed) | (CartStatus::Active, CartStatus::Abandoned)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Completed => "completed",
            CartStatus::Abandoned => "abandoned",
        }
    }
}

/// A user's shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub status: CartStatus,
    pub total_amount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn new(user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: CartId::new(),
            user_id,
            status: CartStatus::Active,
            total_amount: Money::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, CartStatus::Active)
    }

    /// Transition the cart status; illegal transitions are rejected.
    pub fn set_status(&mut self, to: CartStatus) -> Result<(), DomainError> {
        if !self.status.can_transition(to) {
            return Err(DomainError::invariant(format!(
                "illegal cart transition: {} -> {}",
                self.status.as_str(),
                to.as_str()
            )));
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A line item inside a cart.
///
/// `(cart_id, product_id, variant_id)` is unique at the application level;
/// adding a duplicate merges into the existing line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub price: Money,
    pub subtotal: Money,
}

impl CartItem {
    pub fn new(
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: u32,
        price: Money,
    ) -> Self {
        Self {
            id: CartItemId::new(),
            cart_id,
            product_id,
            variant_id,
            quantity,
            price,
            subtotal: price.times(quantity),
        }
    }

    /// Set the quantity and recompute the line subtotal.
    pub fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.subtotal = self.price.times(quantity);
    }

    /// Merge an additional quantity into this line.
    pub fn merge_quantity(&mut self, additional: u32) {
        self.set_quantity(self.quantity + additional);
    }
}
