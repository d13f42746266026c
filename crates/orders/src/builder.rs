//! Order aggregate builder: cart snapshot in, order + items + payment out.
//!
//! Pure assembly, no IO. The resulting aggregate is handed to
//! [`crate::store::OrderStore::commit_checkout`] for the atomic five-write
//! commit.

use thiserror::Error;

use orderflow_cart::{Cart, CartItem};
use orderflow_core::Money;

use crate::order::{Order, OrderItem, OrderNumber};
use crate::payment::{Payment, PaymentMethod};
use crate::status::{OrderStatus, PaymentStatus};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssembleError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("cart is not active")]
    CartNotActive,

    #[error("cart total {cart_total} does not match item subtotals {item_total}")]
    TotalMismatch {
        cart_total: Money,
        item_total: Money,
    },
}

/// Everything the checkout transaction writes, built as one unit.
#[derive(Debug, Clone)]
pub struct CheckoutAggregate {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Payment,
}

/// Convert an active cart into an immutable order aggregate.
///
/// `sequence` is the allocated order-number sequence value. The cart total is
/// cross-checked against the item subtotals so a drifted total can never be
/// frozen into an order.
pub fn assemble(
    cart: &Cart,
    items: &[CartItem],
    sequence: u64,
    method: PaymentMethod,
    shipping_address: Option<String>,
) -> Result<CheckoutAggregate, AssembleError> {
    if !cart.is_active() {
        return Err(AssembleError::CartNotActive);
    }
    if items.is_empty() {
        return Err(AssembleError::EmptyCart);
    }

    let item_total: Money = items.iter().map(|item| item.subtotal).sum();
    if item_total != cart.total_amount {
        return Err(AssembleError::TotalMismatch {
            cart_total: cart.total_amount,
            item_total,
        });
    }

    let now = chrono::Utc::now();
    let order = Order {
        id: orderflow_core::OrderId::new(),
        user_id: cart.user_id,
        cart_id: cart.id,
        order_number: OrderNumber::from_sequence(sequence),
        status: OrderStatus::Pending,
        payment_status: PaymentStatus::Pending,
        total_amount: cart.total_amount,
        shipping_address,
        created_at: now,
        updated_at: now,
    };

    let items = items
        .iter()
        .map(|item| OrderItem::from_cart_item(order.id, item))
        .collect();

    let payment = Payment::new(order.id, cart.user_id, cart.total_amount, method);

    Ok(CheckoutAggregate {
        order,
        items,
        payment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_cart::CartStatus;
    use orderflow_core::{ProductId, UserId};

    fn cart_with_items(quantities: &[(u32, i64)]) -> (Cart, Vec<CartItem>) {
        let mut cart = Cart::new(UserId::new());
        let items: Vec<CartItem> = quantities
            .iter()
            .map(|&(qty, price)| {
                CartItem::new(cart.id, ProductId::new(), None, qty, Money::from_minor(price))
            })
            .collect();
        cart.total_amount = items.iter().map(|i| i.subtotal).sum();
        (cart, items)
    }

    #[test]
    fn assembles_pending_order_and_payment() {
        let (cart, items) = cart_with_items(&[(2, 1000), (1, 500)]);
        let aggregate = assemble(&cart, &items, 7, PaymentMethod::Card, None).unwrap();

        assert_eq!(aggregate.order.status, OrderStatus::Pending);
        assert_eq!(aggregate.order.payment_status, PaymentStatus::Pending);
        assert_eq!(aggregate.order.order_number.as_str(), "ORD-00000007");
        assert_eq!(aggregate.order.total_amount, Money::from_minor(2500));
        assert_eq!(aggregate.items.len(), 2);
        assert_eq!(aggregate.payment.amount, Money::from_minor(2500));
        assert_eq!(aggregate.payment.status, PaymentStatus::Pending);
        assert_eq!(aggregate.payment.order_id, aggregate.order.id);
    }

    #[test]
    fn items_are_frozen_copies() {
        let (cart, items) = cart_with_items(&[(3, 250)]);
        let aggregate = assemble(&cart, &items, 1, PaymentMethod::Cash, None).unwrap();
        let frozen = &aggregate.items[0];
        assert_eq!(frozen.product_id, items[0].product_id);
        assert_eq!(frozen.quantity, 3);
        assert_eq!(frozen.price, Money::from_minor(250));
        assert_eq!(frozen.subtotal, Money::from_minor(750));
    }

    #[test]
    fn empty_cart_is_rejected() {
        let (cart, _) = cart_with_items(&[]);
        let err = assemble(&cart, &[], 1, PaymentMethod::Card, None).unwrap_err();
        assert_eq!(err, AssembleError::EmptyCart);
    }

    #[test]
    fn completed_cart_is_rejected() {
        let (mut cart, items) = cart_with_items(&[(1, 100)]);
        cart.set_status(CartStatus::Completed).unwrap();
        let err = assemble(&cart, &items, 1, PaymentMethod::Card, None).unwrap_err();
        assert_eq!(err, AssembleError::CartNotActive);
    }

    #[test]
    fn drifted_total_is_rejected() {
        let (mut cart, items) = cart_with_items(&[(1, 100)]);
        cart.total_amount = Money::from_minor(999);
        let err = assemble(&cart, &items, 1, PaymentMethod::Card, None).unwrap_err();
        assert!(matches!(err, AssembleError::TotalMismatch { .. }));
    }
}
