//! Payment records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{Money, OrderId, PaymentId, UserId};

use crate::status::{PaymentStatus, TransitionError};

/// How the buyer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Online,
    Wallet,
}

/// A payment attempt for an order.
///
/// Created `pending` inside the checkout transaction; the payment worker is
/// the sole owner of all post-creation transitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    pub user_id: UserId,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub status: PaymentStatus,
    /// Gateway-correlatable settlement identifier, set on completion.
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(order_id: OrderId, user_id: UserId, amount: Money, method: PaymentMethod) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::new(),
            order_id,
            user_id,
            amount,
            payment_method: method,
            status: PaymentStatus::Pending,
            transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Transition the settlement status through the transition table.
    pub fn set_status(&mut self, to: PaymentStatus) -> Result<(), TransitionError> {
        self.status = self.status.transition(to)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Redacted projection for API responses: no transaction identifiers.
    pub fn redacted(&self) -> PaymentProjection {
        PaymentProjection {
            id: self.id,
            status: self.status,
            payment_method: self.payment_method,
        }
    }
}

/// The caller-visible slice of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProjection {
    pub id: PaymentId,
    pub status: PaymentStatus,
    pub payment_method: PaymentMethod,
}
