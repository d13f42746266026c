//! Cart mutation service.
//!
//! All operations are scoped to the caller's own active cart; item ownership
//! is established by joining through the cart, never from a client-supplied
//! cart id.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::debug;

use orderflow_catalog::{CatalogStore, resolve_unit_price};
use orderflow_core::{CartItemId, DomainError, Money, ProductId, StoreError, UserId, VariantId};

use crate::cart::{Cart, CartItem};
use crate::store::CartStore;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("cart not found")]
    CartNotFound,

    #[error("cart item not found")]
    ItemNotFound,

    #[error("product not found")]
    ProductNotFound,

    #[error("variant not found for this product")]
    VariantNotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A cart together with its current items.
#[derive(Debug, Clone)]
pub struct CartView {
    pub cart: Cart,
    pub items: Vec<CartItem>,
}

/// Largest quantity accepted for a single cart line. Together with the
/// catalog's price ceiling this keeps every subtotal far inside `i64`.
pub const MAX_LINE_QUANTITY: u32 = 10_000;

/// Owns all cart item mutation and total recomputation.
pub struct CartService<S> {
    store: Arc<S>,
}

impl<S: CartStore + CatalogStore> CartService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The user's active cart, created with a zero total if none exists.
    pub fn get_or_create_cart(&self, user_id: UserId) -> Result<CartView, CartError> {
        let cart = match self.store.find_active_cart(user_id)? {
            Some(cart) => cart,
            None => {
                let cart = Cart::new(user_id);
                self.store.insert_cart(&cart)?;
                debug!(user_id = %user_id, cart_id = %cart.id, "created active cart");
                cart
            }
        };
        let items = self.store.cart_items(cart.id)?;
        Ok(CartView { cart, items })
    }

    /// Add a product (optionally a specific variant) to the cart.
    ///
    /// A line already holding the same `(product, variant)` pair is merged by
    /// incrementing its quantity instead of inserting a second row.
    pub fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        quantity: u32,
    ) -> Result<CartItem, CartError> {
        validate_quantity(quantity)?;

        let cart = self.get_or_create_cart(user_id)?.cart;

        let product = self
            .store
            .get_product(product_id)?
            .ok_or(CartError::ProductNotFound)?;

        let variant = match variant_id {
            None => None,
            Some(id) => {
                let variant = self
                    .store
                    .get_variant(id)?
                    .filter(|v| v.product_id == product_id)
                    .ok_or(CartError::VariantNotFound)?;
                Some(variant)
            }
        };

        let unit_price = resolve_unit_price(&product, variant.as_ref())?;

        let item = match self.store.find_cart_item(cart.id, product_id, variant_id)? {
            Some(mut existing) => {
                validate_quantity(existing.quantity.saturating_add(quantity))?;
                existing.merge_quantity(quantity);
                self.store.update_cart_item(&existing)?;
                existing
            }
            None => {
                let item = CartItem::new(cart.id, product_id, variant_id, quantity, unit_price);
                self.store.insert_cart_item(&item)?;
                item
            }
        };

        self.recompute_total(&cart)?;
        Ok(item)
    }

    /// Replace the quantity of one of the caller's cart lines.
    pub fn update_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem, CartError> {
        validate_quantity(quantity)?;

        let (cart, mut item) = self.owned_item(user_id, item_id)?;
        item.set_quantity(quantity);
        self.store.update_cart_item(&item)?;
        self.recompute_total(&cart)?;
        Ok(item)
    }

    /// Remove one of the caller's cart lines.
    pub fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<(), CartError> {
        let (cart, item) = self.owned_item(user_id, item_id)?;
        self.store.delete_cart_item(item.id)?;
        self.recompute_total(&cart)?;
        Ok(())
    }

    /// Remove every item from the caller's active cart.
    pub fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        let cart = self
            .store
            .find_active_cart(user_id)?
            .ok_or(CartError::CartNotFound)?;
        self.store.delete_cart_items(cart.id)?;
        self.recompute_total(&cart)?;
        Ok(())
    }

    /// Resolve an item through the caller's active cart (ownership via join).
    fn owned_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
    ) -> Result<(Cart, CartItem), CartError> {
        let cart = self
            .store
            .find_active_cart(user_id)?
            .ok_or(CartError::ItemNotFound)?;
        let item = self
            .store
            .get_cart_item(item_id)?
            .filter(|item| item.cart_id == cart.id)
            .ok_or(CartError::ItemNotFound)?;
        Ok((cart, item))
    }

    /// Full re-sum over current items. Always recomputed from scratch so a
    /// partial failure can never leave the total drifted.
    fn recompute_total(&self, cart: &Cart) -> Result<Money, CartError> {
        let total: Money = self
            .store
            .cart_items(cart.id)?
            .iter()
            .map(|item| item.subtotal)
            .sum();

        let mut cart = cart.clone();
        cart.total_amount = total;
        cart.updated_at = Utc::now();
        self.store.update_cart(&cart)?;
        Ok(total)
    }
}

fn validate_quantity(quantity: u32) -> Result<(), CartError> {
    if quantity == 0 {
        return Err(CartError::Validation("quantity must be at least 1".into()));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(CartError::Validation(format!(
            "quantity must be at most {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}
