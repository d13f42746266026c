//! Payment gateway seam.
//!
//! The real acquirer sits behind [`PaymentGateway`]; the simulated
//! implementation models its latency and failure profile for development and
//! tests.

use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use rand::distributions::Alphanumeric;
use thiserror::Error;
use tracing::debug;

use orderflow_orders::Payment;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway declined or timed out; safe to retry.
    #[error("payment gateway declined: {0}")]
    Declined(String),
}

/// External settlement seam. Implementations must be safe to call from many
/// worker threads at once.
pub trait PaymentGateway: Send + Sync {
    /// Attempt to settle a payment. Returns the gateway transaction id.
    fn settle(&self, payment: &Payment) -> Result<String, GatewayError>;
}

/// Simulated acquirer: fixed latency, configurable decline rate, and
/// `TXN-{millis}-{rand}` transaction ids.
pub struct SimulatedGateway {
    latency: Duration,
    failure_rate: f64,
}

impl SimulatedGateway {
    /// Production-shaped defaults: one second of latency, 10% declines.
    pub fn new() -> Self {
        Self {
            latency: Duration::from_secs(1),
            failure_rate: 0.1,
        }
    }

    /// Deterministic gateway for tests: no latency, never declines.
    pub fn always_succeeds() -> Self {
        Self {
            latency: Duration::ZERO,
            failure_rate: 0.0,
        }
    }

    /// Gateway that declines every attempt.
    pub fn always_declines() -> Self {
        Self {
            latency: Duration::ZERO,
            failure_rate: 1.0,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl PaymentGateway for SimulatedGateway {
    fn settle(&self, payment: &Payment) -> Result<String, GatewayError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let mut rng = rand::thread_rng();
        if rng.r#gen::<f64>() < self.failure_rate {
            debug!(payment_id = %payment.id, "simulated gateway declined");
            return Err(GatewayError::Declined(
                "insufficient funds or card declined".into(),
            ));
        }

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let suffix: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(char::from)
            .collect();
        Ok(format!("TXN-{millis}-{suffix}"))
    }
}
