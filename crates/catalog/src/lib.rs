//! `orderflow-catalog` — products, variants, and unit-price resolution.

pub mod product;
pub mod service;
pub mod store;

pub use product::{Product, ProductStatus, ProductVariant, resolve_unit_price};
pub use service::{CatalogError, CatalogService, MAX_UNIT_PRICE, NewProduct, NewVariant};
pub use store::CatalogStore;
