//! `orderflow-orders` — orders, payments, and the checkout aggregate builder.

pub mod builder;
pub mod order;
pub mod page;
pub mod payment;
pub mod status;
pub mod store;

pub use builder::{AssembleError, CheckoutAggregate, assemble};
pub use order::{Order, OrderItem, OrderNumber};
pub use page::{Page, Paginated};
pub use payment::{Payment, PaymentMethod, PaymentProjection};
pub use status::{OrderStatus, PaymentStatus, TransitionError};
pub use store::OrderStore;
