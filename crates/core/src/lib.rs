//! `orderflow-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;

pub use error::{DomainError, StoreError};
pub use id::{CartId, CartItemId, OrderId, PaymentId, ProductId, UserId, VariantId};
pub use money::Money;
