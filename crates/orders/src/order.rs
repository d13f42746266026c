//! Order and order-item records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_cart::CartItem;
use orderflow_core::{CartId, Money, OrderId, ProductId, UserId, VariantId};

use crate::status::{OrderStatus, PaymentStatus, TransitionError};

/// Human-facing order number: unique, monotonically increasing, with a
/// fixed-width zero-padded numeric suffix (`ORD-00000042`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("ORD-{sequence:08}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An order created from exactly one cart snapshot.
///
/// Immutable after creation except for `status`/`payment_status`, which are
/// driven only by the payment worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub cart_id: CartId,
    pub order_number: OrderNumber,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Money,
    pub shipping_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Transition the fulfillment status through the transition table.
    pub fn set_status(&mut self, to: OrderStatus) -> Result<(), TransitionError> {
        self.status = self.status.transition(to)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Transition the mirrored payment status through the transition table.
    pub fn set_payment_status(&mut self, to: PaymentStatus) -> Result<(), TransitionError> {
        self.payment_status = self.payment_status.transition(to)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Immutable line-item copy of a [`CartItem`] at checkout time.
///
/// A frozen snapshot, decoupled from live product/variant records; never
/// mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub price: Money,
    pub subtotal: Money,
}

impl OrderItem {
    pub fn from_cart_item(order_id: OrderId, item: &CartItem) -> Self {
        Self {
            order_id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            price: item.price,
            subtotal: item.subtotal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_is_zero_padded() {
        assert_eq!(OrderNumber::from_sequence(42).as_str(), "ORD-00000042");
        assert_eq!(
            OrderNumber::from_sequence(123_456_789).as_str(),
            "ORD-123456789"
        );
    }

    #[test]
    fn order_numbers_sort_with_their_sequences() {
        let a = OrderNumber::from_sequence(7);
        let b = OrderNumber::from_sequence(70);
        assert!(a < b);
    }
}
