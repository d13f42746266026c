//! Product and variant records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use orderflow_core::{DomainError, Money, ProductId, VariantId};

/// Product availability lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Active,
    Archived,
}

/// A sellable product with a base price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        Self {
            id: ProductId::new(),
            sku: sku.into(),
            name: name.into(),
            description: None,
            price,
            status: ProductStatus::Active,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, ProductStatus::Active)
    }
}

/// A variant of a product (size, color, ...).
///
/// `price` overrides the product's base price when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: VariantId,
    pub product_id: ProductId,
    pub sku: String,
    pub name: String,
    pub price: Option<Money>,
    pub created_at: DateTime<Utc>,
}

impl ProductVariant {
    pub fn new(product_id: ProductId, sku: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: VariantId::new(),
            product_id,
            sku: sku.into(),
            name: name.into(),
            price: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_price(mut self, price: Money) -> Self {
        self.price = Some(price);
        self
    }
}

/// Resolve the unit price for a cart line.
///
/// A variant must belong to the product it is sold under; a variant without a
/// price override falls back to the product's base price.
pub fn resolve_unit_price(
    product: &Product,
    variant: Option<&ProductVariant>,
) -> Result<Money, DomainError> {
    match variant {
        None => Ok(product.price),
        Some(v) if v.product_id != product.id => Err(DomainError::invariant(
            "variant does not belong to this product",
        )),
        Some(v) => Ok(v.price.unwrap_or(product.price)),
    }
}
