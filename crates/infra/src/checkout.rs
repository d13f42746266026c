//! Checkout orchestration and order queries.
//!
//! Checkout is the pipeline's entry point: freeze the active cart into an
//! order aggregate, commit it atomically, then hand settlement to the payment
//! queue. The enqueue is deliberately outside the transaction and best-effort;
//! a committed order with a pending payment can always be re-driven later.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use orderflow_auth::{AuthzError, Capability, UserContext, authorize};
use orderflow_cart::CartStore;
use orderflow_core::{OrderId, StoreError, UserId};
use orderflow_orders::{
    AssembleError, Order, OrderItem, OrderStore, Page, Paginated, PaymentMethod,
    PaymentProjection, assemble,
};
use orderflow_queue::{EnqueueOptions, JobQueue, Priority, RetryPolicy};

use crate::jobs::{PAYMENT_QUEUE, PROCESS_PAYMENT, PaymentData, PaymentJob};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("no active cart")]
    CartNotFound,

    #[error("order not found")]
    OrderNotFound,

    #[error(transparent)]
    Assemble(#[from] AssembleError),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the caller gets back from a successful checkout. The payment is
/// exposed only through its redacted projection.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub payment: PaymentProjection,
}

/// An order with its line items and redacted payment history.
#[derive(Debug, Clone)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payments: Vec<PaymentProjection>,
}

/// Orchestrates cart-to-order conversion and order reads.
pub struct CheckoutService<S> {
    store: Arc<S>,
    queue: Arc<JobQueue>,
    payment_retry: RetryPolicy,
}

impl<S: CartStore + OrderStore> CheckoutService<S> {
    pub fn new(store: Arc<S>, queue: Arc<JobQueue>) -> Self {
        Self {
            store,
            queue,
            payment_retry: RetryPolicy::default(),
        }
    }

    /// Override the retry policy attached to settlement jobs.
    pub fn with_payment_retry(mut self, policy: RetryPolicy) -> Self {
        self.payment_retry = policy;
        self
    }

    /// Convert the caller's active cart into a pending order.
    ///
    /// Allocates the order number, assembles the aggregate, commits it in one
    /// transaction (which also completes the cart), and finally enqueues the
    /// settlement job at high priority. An enqueue failure is logged and
    /// swallowed: the order is already durable.
    pub fn checkout(
        &self,
        user_id: UserId,
        method: PaymentMethod,
        shipping_address: Option<String>,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let cart = self
            .store
            .find_active_cart(user_id)?
            .ok_or(CheckoutError::CartNotFound)?;
        let items = self.store.cart_items(cart.id)?;

        let sequence = self.store.next_order_sequence()?;
        let aggregate = assemble(&cart, &items, sequence, method, shipping_address)?;
        self.store.commit_checkout(&aggregate)?;

        info!(
            order_id = %aggregate.order.id,
            order_number = %aggregate.order.order_number,
            user_id = %user_id,
            total = %aggregate.order.total_amount,
            "checkout committed"
        );

        let job = PaymentJob {
            payment_id: aggregate.payment.id,
            order_id: aggregate.order.id,
            payment_data: PaymentData {
                method: aggregate.payment.payment_method,
                amount: aggregate.payment.amount,
            },
        };
        let options = EnqueueOptions::with_priority(Priority::High)
            .with_retry_policy(self.payment_retry.clone());
        if let Err(err) = self
            .queue
            .enqueue(PAYMENT_QUEUE, PROCESS_PAYMENT, &job, options)
        {
            error!(
                order_id = %aggregate.order.id,
                payment_id = %aggregate.payment.id,
                error = %err,
                "failed to enqueue settlement job; payment stays pending"
            );
        }

        Ok(CheckoutOutcome {
            payment: aggregate.payment.redacted(),
            order: aggregate.order,
        })
    }

    /// Fetch one order with items and payment history.
    ///
    /// Customers see only their own orders; an order owned by someone else
    /// presents as not found rather than forbidden. Support and admin roles
    /// may fetch any order.
    pub fn get_order(
        &self,
        ctx: &UserContext,
        order_id: OrderId,
    ) -> Result<OrderDetail, CheckoutError> {
        let order = self
            .store
            .get_order(order_id)?
            .ok_or(CheckoutError::OrderNotFound)?;

        if order.user_id != ctx.user_id {
            authorize(ctx, Capability::ViewAnyOrder)
                .map_err(|_| CheckoutError::OrderNotFound)?;
        }

        let items = self.store.order_items(order.id)?;
        let payments = self
            .store
            .payments_for_order(order.id)?
            .iter()
            .map(|p| p.redacted())
            .collect();

        Ok(OrderDetail {
            order,
            items,
            payments,
        })
    }

    /// The caller's own orders, newest first.
    pub fn get_user_orders(
        &self,
        ctx: &UserContext,
        page: Page,
    ) -> Result<Paginated<Order>, CheckoutError> {
        let (orders, total) = self.store.list_orders_for_user(ctx.user_id, page)?;
        Ok(Paginated::new(orders, total, page))
    }
}
