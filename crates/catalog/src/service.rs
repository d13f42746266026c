//! Capability-guarded catalog management.

use std::sync::Arc;

use thiserror::Error;

use orderflow_auth::{AuthzError, Capability, UserContext, authorize};
use orderflow_core::{Money, ProductId, StoreError};

use crate::product::{Product, ProductVariant};
use crate::store::CatalogStore;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found")]
    ProductNotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Input for product creation.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
}

/// Input for variant creation.
#[derive(Debug, Clone)]
pub struct NewVariant {
    pub sku: String,
    pub name: String,
    pub price: Option<Money>,
}

/// Largest unit price accepted. Combined with the cart's per-line quantity
/// ceiling this keeps every line subtotal far inside `i64`.
pub const MAX_UNIT_PRICE: Money = Money::from_major(1_000_000);

/// Catalog write surface. All writes require `ManageCatalog`.
pub struct CatalogService<S> {
    store: Arc<S>,
}

impl<S: CatalogStore> CatalogService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create_product(
        &self,
        ctx: &UserContext,
        input: NewProduct,
    ) -> Result<Product, CatalogError> {
        authorize(ctx, Capability::ManageCatalog)?;

        if input.name.trim().is_empty() {
            return Err(CatalogError::Validation("product name is required".into()));
        }
        validate_price(input.price)?;

        let mut product = Product::new(input.sku, input.name, input.price);
        product.description = input.description;
        self.store.insert_product(&product)?;
        Ok(product)
    }

    pub fn add_variant(
        &self,
        ctx: &UserContext,
        product_id: ProductId,
        input: NewVariant,
    ) -> Result<ProductVariant, CatalogError> {
        authorize(ctx, Capability::ManageCatalog)?;

        if let Some(price) = input.price {
            validate_price(price)?;
        }

        let product = self
            .store
            .get_product(product_id)?
            .ok_or(CatalogError::ProductNotFound)?;

        let mut variant = ProductVariant::new(product.id, input.sku, input.name);
        variant.price = input.price;
        self.store.insert_variant(&variant)?;
        Ok(variant)
    }

    pub fn get_product(&self, product_id: ProductId) -> Result<Product, CatalogError> {
        self.store
            .get_product(product_id)?
            .ok_or(CatalogError::ProductNotFound)
    }
}

fn validate_price(price: Money) -> Result<(), CatalogError> {
    if price < Money::ZERO {
        return Err(CatalogError::Validation("price must not be negative".into()));
    }
    if price > MAX_UNIT_PRICE {
        return Err(CatalogError::Validation(format!(
            "price must not exceed {MAX_UNIT_PRICE}"
        )));
    }
    Ok(())
}
