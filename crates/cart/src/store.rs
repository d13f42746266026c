//! Cart persistence contract.

use orderflow_core::{CartId, CartItemId, ProductId, StoreError, UserId, VariantId};

use crate::cart::{Cart, CartItem};

/// Repository-style access to carts and their items.
pub trait CartStore: Send + Sync {
    /// The user's single `active` cart, if any.
    fn find_active_cart(&self, user_id: UserId) -> Result<Option<Cart>, StoreError>;

    fn insert_cart(&self, cart: &Cart) -> Result<(), StoreError>;

    fn update_cart(&self, cart: &Cart) -> Result<(), StoreError>;

    fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError>;

    /// Lookup by the application-level uniqueness key.
    fn find_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Option<CartItem>, StoreError>;

    fn get_cart_item(&self, item_id: CartItemId) -> Result<Option<CartItem>, StoreError>;

    fn insert_cart_item(&self, item: &CartItem) -> Result<(), StoreError>;

    fn update_cart_item(&self, item: &CartItem) -> Result<(), StoreError>;

    fn delete_cart_item(&self, item_id: CartItemId) -> Result<(), StoreError>;

    /// Remove every item in the cart.
    fn delete_cart_items(&self, cart_id: CartId) -> Result<(), StoreError>;
}
