//! In-memory implementation of every repository trait.
//!
//! One mutex over the whole state; multi-entity writes (the checkout unit of
//! work) happen under a single lock acquisition, which gives them the same
//! all-or-nothing visibility a database transaction would.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use orderflow_auth::{User, UserDirectory};
use orderflow_cart::{Cart, CartItem, CartStatus, CartStore};
use orderflow_catalog::{CatalogStore, Product, ProductVariant};
use orderflow_core::{
    CartId, CartItemId, OrderId, PaymentId, ProductId, StoreError, UserId, VariantId,
};
use orderflow_orders::{CheckoutAggregate, Order, OrderItem, OrderStore, Page, Payment};

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    products: HashMap<ProductId, Product>,
    variants: HashMap<VariantId, ProductVariant>,
    carts: HashMap<CartId, Cart>,
    cart_items: HashMap<CartItemId, CartItem>,
    orders: HashMap<OrderId, Order>,
    order_items: Vec<OrderItem>,
    payments: HashMap<PaymentId, Payment>,
}

/// In-memory store for tests/dev.
pub struct InMemoryStore {
    state: Mutex<State>,
    order_seq: AtomicU64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            order_seq: AtomicU64::new(0),
        }
    }

    /// Seed a user record (the auth service owns user creation in production).
    pub fn insert_user(&self, user: &User) {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(user.id, user.clone());
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDirectory for InMemoryStore {
    fn get_user(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().unwrap().users.get(&user_id).cloned())
    }
}

impl CatalogStore for InMemoryStore {
    fn get_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.state.lock().unwrap().products.get(&id).cloned())
    }

    fn get_variant(&self, id: VariantId) -> Result<Option<ProductVariant>, StoreError> {
        Ok(self.state.lock().unwrap().variants.get(&id).cloned())
    }

    fn insert_product(&self, product: &Product) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.products.contains_key(&product.id) {
            return Err(StoreError::Conflict("product already exists".into()));
        }
        state.products.insert(product.id, product.clone());
        Ok(())
    }

    fn insert_variant(&self, variant: &ProductVariant) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.products.contains_key(&variant.product_id) {
            return Err(StoreError::NotFound("product"));
        }
        state.variants.insert(variant.id, variant.clone());
        Ok(())
    }
}

impl CartStore for InMemoryStore {
    fn find_active_cart(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .carts
            .values()
            .find(|c| c.user_id == user_id && c.is_active())
            .cloned())
    }

    fn insert_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if state
            .carts
            .values()
            .any(|c| c.user_id == cart.user_id && c.is_active())
        {
            return Err(StoreError::Conflict("user already has an active cart".into()));
        }
        state.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    fn update_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.carts.contains_key(&cart.id) {
            return Err(StoreError::NotFound("cart"));
        }
        state.carts.insert(cart.id, cart.clone());
        Ok(())
    }

    fn cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut items: Vec<CartItem> = state
            .cart_items
            .values()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.id.as_uuid().as_u128());
        Ok(items)
    }

    fn find_cart_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<Option<CartItem>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .cart_items
            .values()
            .find(|i| {
                i.cart_id == cart_id && i.product_id == product_id && i.variant_id == variant_id
            })
            .cloned())
    }

    fn get_cart_item(&self, item_id: CartItemId) -> Result<Option<CartItem>, StoreError> {
        Ok(self.state.lock().unwrap().cart_items.get(&item_id).cloned())
    }

    fn insert_cart_item(&self, item: &CartItem) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.cart_items.insert(item.id, item.clone());
        Ok(())
    }

    fn update_cart_item(&self, item: &CartItem) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.cart_items.contains_key(&item.id) {
            return Err(StoreError::NotFound("cart item"));
        }
        state.cart_items.insert(item.id, item.clone());
        Ok(())
    }

    fn delete_cart_item(&self, item_id: CartItemId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state
            .cart_items
            .remove(&item_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound("cart item"))
    }

    fn delete_cart_items(&self, cart_id: CartId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.cart_items.retain(|_, i| i.cart_id != cart_id);
        Ok(())
    }
}

impl OrderStore for InMemoryStore {
    fn next_order_sequence(&self) -> Result<u64, StoreError> {
        Ok(self.order_seq.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn commit_checkout(&self, aggregate: &CheckoutAggregate) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();

        // All validation happens before any write: this block either applies
        // the full aggregate or leaves the state untouched.
        let cart = state
            .carts
            .get(&aggregate.order.cart_id)
            .ok_or(StoreError::NotFound("cart"))?;
        if !cart.is_active() {
            return Err(StoreError::Conflict(format!(
                "cart {} is not active",
                cart.id
            )));
        }
        if state.orders.contains_key(&aggregate.order.id) {
            return Err(StoreError::Conflict("order already exists".into()));
        }
        if state
            .orders
            .values()
            .any(|o| o.order_number == aggregate.order.order_number)
        {
            return Err(StoreError::Conflict(format!(
                "duplicate order number {}",
                aggregate.order.order_number
            )));
        }

        let mut cart = cart.clone();
        cart.set_status(CartStatus::Completed)
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        state.orders.insert(aggregate.order.id, aggregate.order.clone());
        state.order_items.extend(aggregate.items.iter().cloned());
        state
            .payments
            .insert(aggregate.payment.id, aggregate.payment.clone());
        state.carts.insert(cart.id, cart);
        Ok(())
    }

    fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.state.lock().unwrap().orders.get(&order_id).cloned())
    }

    fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.orders.contains_key(&order.id) {
            return Err(StoreError::NotFound("order"));
        }
        state.orders.insert(order.id, order.clone());
        Ok(())
    }

    fn order_items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .order_items
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    fn get_payment(&self, payment_id: PaymentId) -> Result<Option<Payment>, StoreError> {
        Ok(self.state.lock().unwrap().payments.get(&payment_id).cloned())
    }

    fn update_payment(&self, payment: &Payment) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if !state.payments.contains_key(&payment.id) {
            return Err(StoreError::NotFound("payment"));
        }
        state.payments.insert(payment.id, payment.clone());
        Ok(())
    }

    fn payments_for_order(&self, order_id: OrderId) -> Result<Vec<Payment>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut payments: Vec<Payment> = state
            .payments
            .values()
            .filter(|p| p.order_id == order_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    fn list_orders_for_user(
        &self,
        user_id: UserId,
        page: Page,
    ) -> Result<(Vec<Order>, u64), StoreError> {
        let state = self.state.lock().unwrap();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| std::cmp::Reverse(o.created_at));

        let total = orders.len() as u64;
        let items = orders
            .into_iter()
            .skip(page.offset())
            .take(page.limit as usize)
            .collect();
        Ok((items, total))
    }
}
