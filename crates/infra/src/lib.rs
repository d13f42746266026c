//! `orderflow-infra` — store adapters, checkout orchestration, and the
//! worker processes behind the fulfillment pipeline.

pub mod checkout;
pub mod gateway;
pub mod jobs;
pub mod notify;
pub mod store;
pub mod workers;

#[cfg(test)]
mod integration_tests;

pub use checkout::{CheckoutError, CheckoutOutcome, CheckoutService, OrderDetail};
pub use gateway::{GatewayError, PaymentGateway, SimulatedGateway};
pub use notify::{LogMailer, LogSmsGateway, Mailer, SendError, SmsGateway};
pub use store::InMemoryStore;
pub use workers::{NotificationWorker, PaymentWorker};
