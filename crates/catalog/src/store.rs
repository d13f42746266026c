//! Catalog persistence contract.

use orderflow_core::{ProductId, StoreError, VariantId};

use crate::product::{Product, ProductVariant};

/// Repository-style access to products and variants.
pub trait CatalogStore: Send + Sync {
    fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, StoreError>;

    fn insert_product(&self, product: &Product) -> Result<(), StoreError>;

    fn insert_variant(&self, variant: &ProductVariant) -> Result<(), StoreError>;
}
