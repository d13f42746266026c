//! `orderflow-cart` — the shopping cart and its mutation service.

pub mod cart;
pub mod service;
pub mod store;

pub use cart::{Cart, CartItem, CartStatus};
pub use service::{CartError, CartService, CartView, MAX_LINE_QUANTITY};
pub use store::CartStore;
