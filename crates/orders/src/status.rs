//! Explicit status state machines for orders and payments.
//!
//! Transitions are enumerated in one table per entity; anything not listed is
//! rejected with [`TransitionError`] instead of silently applied.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Attempted transition not present in the entity's transition table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("illegal {entity} transition: {from} -> {to}")]
pub struct TransitionError {
    pub entity: &'static str,
    pub from: &'static str,
    pub to: &'static str,
}

/// Order fulfillment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Transition table. `Confirmed` is entered only via a completed payment
    /// and never regresses.
    pub fn can_transition(self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Processing, Confirmed)
                | (Processing, Cancelled)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Shipped, Delivered)
        )
    }

    pub fn transition(self, to: OrderStatus) -> Result<OrderStatus, TransitionError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(TransitionError {
                entity: "order",
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }
}

/// Payment settlement lifecycle. Shared by `Payment.status` and
/// `Order.payment_status`, which move together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }

    /// `Refunded` is reachable only from `Completed`; `Failed` and `Refunded`
    /// are terminal.
    pub fn can_transition(self, to: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Completed, Refunded)
        )
    }

    pub fn transition(self, to: PaymentStatus) -> Result<PaymentStatus, TransitionError> {
        if self.can_transition(to) {
            Ok(to)
        } else {
            Err(TransitionError {
                entity: "payment",
                from: self.as_str(),
                to: to.as_str(),
            })
        }
    }

    /// No further automatic transition expected.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PaymentStatus::Completed | PaymentStatus::Failed | PaymentStatus::Refunded
        )
    }
}
