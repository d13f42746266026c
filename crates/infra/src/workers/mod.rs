//! Background worker pools for the fulfillment pipeline.

pub mod notification;
pub mod payment;

pub use notification::NotificationWorker;
pub use payment::PaymentWorker;
