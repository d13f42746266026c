//! End-to-end pipeline tests: cart through checkout, settlement, and
//! notification against the in-memory store and real worker pools.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use orderflow_auth::{Role, User, UserContext};
use orderflow_cart::CartService;
use orderflow_catalog::{CatalogStore, Product, ProductVariant};
use orderflow_core::{Money, UserId};
use orderflow_orders::{OrderStatus, OrderStore, Page, PaymentMethod, PaymentStatus};
use orderflow_queue::{JobQueue, JobState, RetryPolicy};

use crate::checkout::{CheckoutError, CheckoutService};
use crate::gateway::SimulatedGateway;
use crate::jobs::{NOTIFICATION_QUEUE, ORDER_CONFIRMATION, PAYMENT_FAILED, PAYMENT_QUEUE};
use crate::notify::doubles::{RecordingMailer, RecordingSms};
use crate::store::InMemoryStore;
use crate::workers::{NotificationWorker, PaymentWorker};

struct Pipeline {
    store: Arc<InMemoryStore>,
    queue: Arc<JobQueue>,
    carts: CartService<InMemoryStore>,
    checkout: CheckoutService<InMemoryStore>,
}

fn pipeline(payment_retry: RetryPolicy) -> Pipeline {
    orderflow_observability::init();
    let store = Arc::new(InMemoryStore::new());
    let queue = Arc::new(JobQueue::new());
    Pipeline {
        carts: CartService::new(store.clone()),
        checkout: CheckoutService::new(store.clone(), queue.clone())
            .with_payment_retry(payment_retry),
        store,
        queue,
    }
}

fn seeded_user(store: &InMemoryStore) -> User {
    let user = User::new("Asha")
        .with_email("asha@example.com")
        .with_phone("+15550100");
    store.insert_user(&user);
    user
}

fn seeded_product(store: &InMemoryStore, price: Money) -> Product {
    let product = Product::new("SKU-MUG", "Mug", price);
    store.insert_product(&product).unwrap();
    product
}

fn wait_until(timeout: Duration, mut pred: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if pred() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    pred()
}

#[test]
fn add_update_remove_keeps_cart_total_consistent() {
    let p = pipeline(RetryPolicy::no_retry());
    let user = seeded_user(&p.store);
    let product = seeded_product(&p.store, Money::from_minor(1050));
    let variant = ProductVariant::new(product.id, "SKU-MUG-L", "Large")
        .with_price(Money::from_minor(1250));
    p.store.insert_variant(&variant).unwrap();

    // Same (product, variant) pair merges into one line.
    let item = p.carts.add_item(user.id, product.id, None, 2).unwrap();
    p.carts.add_item(user.id, product.id, None, 1).unwrap();
    let line = p
        .carts
        .add_item(user.id, product.id, Some(variant.id), 1)
        .unwrap();

    let view = p.carts.get_or_create_cart(user.id).unwrap();
    assert_eq!(view.items.len(), 2);
    assert_eq!(
        view.cart.total_amount,
        Money::from_minor(3 * 1050 + 1250)
    );

    let updated = p.carts.update_item(user.id, item.id, 1).unwrap();
    assert_eq!(updated.subtotal, Money::from_minor(1050));
    p.carts.remove_item(user.id, line.id).unwrap();

    let view = p.carts.get_or_create_cart(user.id).unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.cart.total_amount, Money::from_minor(1050));
}

#[test]
fn line_quantities_are_capped() {
    let p = pipeline(RetryPolicy::no_retry());
    let user = seeded_user(&p.store);
    let product = seeded_product(&p.store, Money::from_major(20));

    assert!(
        p.carts
            .add_item(user.id, product.id, None, orderflow_cart::MAX_LINE_QUANTITY + 1)
            .is_err()
    );

    // Merging into an existing line cannot sneak past the ceiling either.
    let item = p
        .carts
        .add_item(user.id, product.id, None, orderflow_cart::MAX_LINE_QUANTITY)
        .unwrap();
    assert!(p.carts.add_item(user.id, product.id, None, 1).is_err());
    assert!(
        p.carts
            .update_item(user.id, item.id, orderflow_cart::MAX_LINE_QUANTITY + 1)
            .is_err()
    );

    let view = p.carts.get_or_create_cart(user.id).unwrap();
    assert_eq!(view.items[0].quantity, orderflow_cart::MAX_LINE_QUANTITY);
}

#[test]
fn checkout_with_empty_cart_is_rejected() {
    let p = pipeline(RetryPolicy::no_retry());
    let user = seeded_user(&p.store);
    p.carts.get_or_create_cart(user.id).unwrap();

    let err = p
        .checkout
        .checkout(user.id, PaymentMethod::Card, None)
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Assemble(_)));
    assert_eq!(p.queue.counts(PAYMENT_QUEUE).total(), 0);
}

#[test]
fn checkout_freezes_cart_and_enqueues_settlement() {
    let p = pipeline(RetryPolicy::no_retry());
    let user = seeded_user(&p.store);
    let product = seeded_product(&p.store, Money::from_major(20));
    p.carts.add_item(user.id, product.id, None, 2).unwrap();

    let outcome = p
        .checkout
        .checkout(user.id, PaymentMethod::Card, Some("12 Hill Rd".into()))
        .unwrap();

    assert_eq!(outcome.order.status, OrderStatus::Pending);
    assert_eq!(outcome.order.total_amount, Money::from_major(40));
    assert_eq!(outcome.payment.status, PaymentStatus::Pending);
    assert_eq!(outcome.order.order_number.as_str(), "ORD-00000001");

    // The cart is consumed; the next call starts a fresh one.
    let view = p.carts.get_or_create_cart(user.id).unwrap();
    assert!(view.items.is_empty());
    assert_ne!(view.cart.id, outcome.order.cart_id);

    assert_eq!(p.queue.counts(PAYMENT_QUEUE).waiting, 1);

    // A second checkout with the fresh empty cart fails; no second order.
    assert!(
        p.checkout
            .checkout(user.id, PaymentMethod::Card, None)
            .is_err()
    );
    let ctx = UserContext::customer(user.id);
    let orders = p.checkout.get_user_orders(&ctx, Page::default()).unwrap();
    assert_eq!(orders.total, 1);
}

#[test]
fn happy_path_settles_payment_and_delivers_confirmation() {
    let p = pipeline(RetryPolicy::default());
    let user = seeded_user(&p.store);
    let product = seeded_product(&p.store, Money::from_major(20));
    p.carts.add_item(user.id, product.id, None, 1).unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let sms = Arc::new(RecordingSms::default());
    let payment_pool = PaymentWorker::spawn(
        p.store.clone(),
        p.queue.clone(),
        Arc::new(SimulatedGateway::always_succeeds()),
        PaymentWorker::default_config().with_poll_interval(Duration::from_millis(2)),
    );
    let notification_pool = NotificationWorker::spawn(
        p.store.clone(),
        p.queue.clone(),
        mailer.clone(),
        sms.clone(),
        NotificationWorker::default_config().with_poll_interval(Duration::from_millis(2)),
    );

    let outcome = p
        .checkout
        .checkout(user.id, PaymentMethod::Card, None)
        .unwrap();

    assert!(wait_until(Duration::from_secs(3), || {
        p.queue.counts(NOTIFICATION_QUEUE).completed == 1
    }));
    payment_pool.shutdown();
    notification_pool.shutdown();

    let order = p.store.get_order(outcome.order.id).unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.payment_status, PaymentStatus::Completed);

    let payment = p.store.get_payment(outcome.payment.id).unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Completed);
    assert!(payment.transaction_id.is_some());

    // Exactly one confirmation, over both channels.
    assert_eq!(mailer.sent.lock().unwrap().len(), 1);
    assert_eq!(sms.sent.lock().unwrap().len(), 1);
    assert_eq!(p.queue.counts(PAYMENT_QUEUE).completed, 1);
}

#[test]
fn exhausted_settlement_fails_payment_and_notifies_exactly_once() {
    let p = pipeline(RetryPolicy::exponential(3, Duration::from_millis(5)));
    let user = seeded_user(&p.store);
    let product = seeded_product(&p.store, Money::from_major(20));
    p.carts.add_item(user.id, product.id, None, 1).unwrap();

    let mailer = Arc::new(RecordingMailer::default());
    let sms = Arc::new(RecordingSms::default());
    let payment_pool = PaymentWorker::spawn(
        p.store.clone(),
        p.queue.clone(),
        Arc::new(SimulatedGateway::always_declines()),
        PaymentWorker::default_config().with_poll_interval(Duration::from_millis(2)),
    );
    let notification_pool = NotificationWorker::spawn(
        p.store.clone(),
        p.queue.clone(),
        mailer.clone(),
        sms.clone(),
        NotificationWorker::default_config().with_poll_interval(Duration::from_millis(2)),
    );

    let outcome = p
        .checkout
        .checkout(user.id, PaymentMethod::Card, None)
        .unwrap();

    assert!(wait_until(Duration::from_secs(3), || {
        p.queue.counts(PAYMENT_QUEUE).failed == 1
            && p.queue.counts(NOTIFICATION_QUEUE).completed == 1
    }));
    payment_pool.shutdown();
    notification_pool.shutdown();

    let payment = p.store.get_payment(outcome.payment.id).unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Failed);
    assert!(payment.transaction_id.is_none());

    // Order stays pending for a manual retry path; payment status mirrors.
    let order = p.store.get_order(outcome.order.id).unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Failed);

    // One failure notice, email only, despite three delivery attempts.
    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.starts_with("Payment failed"));
    assert!(sms.sent.lock().unwrap().is_empty());
}

#[test]
fn order_visibility_follows_ownership_and_role() {
    let p = pipeline(RetryPolicy::no_retry());
    let owner = seeded_user(&p.store);
    let product = seeded_product(&p.store, Money::from_major(20));
    p.carts.add_item(owner.id, product.id, None, 1).unwrap();
    let outcome = p
        .checkout
        .checkout(owner.id, PaymentMethod::Card, None)
        .unwrap();

    let owner_ctx = UserContext::customer(owner.id);
    let detail = p.checkout.get_order(&owner_ctx, outcome.order.id).unwrap();
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.payments.len(), 1);

    // Another customer sees someone else's order as missing, not forbidden.
    let stranger = UserContext::customer(UserId::new());
    assert!(matches!(
        p.checkout.get_order(&stranger, outcome.order.id),
        Err(CheckoutError::OrderNotFound)
    ));

    // Support staff may look at any order.
    let support = UserContext::new(UserId::new(), Role::Support);
    assert!(p.checkout.get_order(&support, outcome.order.id).is_ok());
}

#[test]
fn concurrent_checkouts_get_unique_order_numbers() {
    let store = Arc::new(InMemoryStore::new());
    let queue = Arc::new(JobQueue::new());
    let product = seeded_product(&store, Money::from_major(5));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let queue = queue.clone();
        let product_id = product.id;
        handles.push(thread::spawn(move || {
            let carts = CartService::new(store.clone());
            let checkout = CheckoutService::new(store, queue);
            let user = UserId::new();
            carts.add_item(user, product_id, None, 1).unwrap();
            checkout
                .checkout(user, PaymentMethod::Cash, None)
                .unwrap()
                .order
                .order_number
        }));
    }

    let mut numbers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 8);
}

proptest! {
    // The stored cart total always equals the sum of its line subtotals,
    // no matter the sequence of adds and quantity updates.
    #[test]
    fn cart_total_matches_line_subtotals(
        prices in proptest::collection::vec(1i64..50_000, 1..5),
        quantities in proptest::collection::vec(1u32..10, 1..12),
    ) {
        let store = Arc::new(InMemoryStore::new());
        let carts = CartService::new(store.clone());
        let user = UserId::new();

        let products: Vec<Product> = prices
            .iter()
            .enumerate()
            .map(|(i, &price)| {
                let product = Product::new(
                    format!("SKU-{i}"),
                    format!("Product {i}"),
                    Money::from_minor(price),
                );
                store.insert_product(&product).unwrap();
                product
            })
            .collect();

        for (i, &qty) in quantities.iter().enumerate() {
            let product = &products[i % products.len()];
            carts.add_item(user, product.id, None, qty).unwrap();
        }

        let view = carts.get_or_create_cart(user).unwrap();
        let expected: Money = view.items.iter().map(|item| item.subtotal).sum();
        prop_assert_eq!(view.cart.total_amount, expected);
    }
}

#[test]
fn closed_queue_lets_checkout_commit_without_a_settlement_job() {
    let p = pipeline(RetryPolicy::no_retry());
    let user = seeded_user(&p.store);
    let product = seeded_product(&p.store, Money::from_major(20));
    p.carts.add_item(user.id, product.id, None, 1).unwrap();

    p.queue.close();
    let outcome = p
        .checkout
        .checkout(user.id, PaymentMethod::Card, None)
        .unwrap();

    // The order is durable even though the enqueue was dropped.
    assert!(p.store.get_order(outcome.order.id).unwrap().is_some());
    let payment = p.store.get_payment(outcome.payment.id).unwrap().unwrap();
    assert_eq!(payment.status, PaymentStatus::Pending);
}

#[test]
fn queue_health_reflects_pipeline_traffic() {
    let p = pipeline(RetryPolicy::no_retry());
    let user = seeded_user(&p.store);
    let product = seeded_product(&p.store, Money::from_major(20));
    p.carts.add_item(user.id, product.id, None, 1).unwrap();
    p.checkout
        .checkout(user.id, PaymentMethod::Card, None)
        .unwrap();

    let health = p.queue.health();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.queues[PAYMENT_QUEUE].waiting, 1);

    let job = p.queue.claim_next(PAYMENT_QUEUE).unwrap();
    assert!(matches!(job.state, JobState::Active));
}

#[test]
fn notification_job_names_route_to_their_kinds() {
    use crate::jobs::NotificationKind;
    assert_eq!(
        NotificationKind::from_job_name(ORDER_CONFIRMATION),
        Some(NotificationKind::OrderConfirmation)
    );
    assert_eq!(
        NotificationKind::from_job_name(PAYMENT_FAILED),
        Some(NotificationKind::PaymentFailed)
    );
}
