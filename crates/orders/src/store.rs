//! Order persistence contract, including the checkout unit of work.

use orderflow_core::{OrderId, PaymentId, StoreError, UserId};

use crate::builder::CheckoutAggregate;
use crate::order::{Order, OrderItem};
use crate::page::Page;
use crate::payment::Payment;

/// Repository-style access to orders and payments.
pub trait OrderStore: Send + Sync {
    /// Allocate the next order-number sequence value.
    ///
    /// Unique and monotonically increasing under any concurrency; a checkout
    /// that later aborts may leave a gap, which is acceptable.
    fn next_order_sequence(&self) -> Result<u64, StoreError>;

    /// Atomically persist the checkout aggregate and mark its source cart
    /// `completed`: order, order items, payment, cart status — all commit or
    /// none do. Fails with [`StoreError::Conflict`] if the cart is no longer
    /// active (concurrent double-checkout).
    fn commit_checkout(&self, aggregate: &CheckoutAggregate) -> Result<(), StoreError>;

    fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError>;

    fn update_order(&self, order: &Order) -> Result<(), StoreError>;

    fn order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError>;

    fn get_payment(&self, payment_id: PaymentId) -> Result<Option<Payment>, StoreError>;

    fn update_payment(&self, payment: &Payment) -> Result<(), StoreError>;

    fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StoreError>;

    /// The user's orders, newest first, plus the total count.
    fn list_orders_for_user(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<(Vec<Order>, u64), StoreError>;
}
