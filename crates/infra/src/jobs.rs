//! Queue topology and job payloads for the fulfillment pipeline.
//!
//! Payloads carry primitive identifiers only; workers re-resolve records from
//! the store on every delivery.

use serde::{Deserialize, Serialize};

use orderflow_core::{Money, OrderId, PaymentId, UserId};
use orderflow_orders::PaymentMethod;

/// Queue consumed by payment workers.
pub const PAYMENT_QUEUE: &str = "payment-processing";
/// Queue consumed by notification workers.
pub const NOTIFICATION_QUEUE: &str = "notifications";

/// Job name: settle one payment.
pub const PROCESS_PAYMENT: &str = "process-payment";
/// Job name: notify the buyer their order is confirmed.
pub const ORDER_CONFIRMATION: &str = "order-confirmation";
/// Job name: notify the buyer their payment failed.
pub const PAYMENT_FAILED: &str = "payment-failed";

/// Payload of a [`PROCESS_PAYMENT`] job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentJob {
    pub payment_id: PaymentId,
    pub order_id: OrderId,
    pub payment_data: PaymentData,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentData {
    pub method: PaymentMethod,
    pub amount: Money,
}

/// Payload of [`ORDER_CONFIRMATION`] / [`PAYMENT_FAILED`] jobs. The variant
/// is carried in the job name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationJob {
    pub order_id: OrderId,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// The notification variants the worker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OrderConfirmation,
    PaymentFailed,
}

impl NotificationKind {
    pub fn from_job_name(name: &str) -> Option<Self> {
        match name {
            ORDER_CONFIRMATION => Some(Self::OrderConfirmation),
            PAYMENT_FAILED => Some(Self::PaymentFailed),
            _ => None,
        }
    }
}
