//! Buyer notification worker.
//!
//! Consumes the notification queue and fans one job out to the channels the
//! user has on file: order confirmations go to email and SMS, payment
//! failures to email only. A user without a given contact point simply skips
//! that channel.

use std::sync::Arc;

use tracing::{info, warn};

use orderflow_auth::UserDirectory;
use orderflow_orders::OrderStore;
use orderflow_queue::{Job, JobError, JobQueue, RateLimit, Worker, WorkerConfig, WorkerHandle};

use crate::jobs::{NOTIFICATION_QUEUE, NotificationJob, NotificationKind};
use crate::notify::{Mailer, SmsGateway};

/// Spawns the notification worker pool.
pub struct NotificationWorker;

impl NotificationWorker {
    /// Production-shaped pool: twenty concurrent sends, 200 jobs/s.
    pub fn default_config() -> WorkerConfig {
        WorkerConfig::new("notification-worker", NOTIFICATION_QUEUE)
            .with_concurrency(20)
            .with_rate_limit(RateLimit::per_second(200))
    }

    pub fn spawn<S, M, T>(
        store: Arc<S>,
        queue: Arc<JobQueue>,
        mailer: Arc<M>,
        sms: Arc<T>,
        config: WorkerConfig,
    ) -> WorkerHandle
    where
        S: OrderStore + UserDirectory + 'static,
        M: Mailer + 'static,
        T: SmsGateway + 'static,
    {
        Worker::spawn(
            queue,
            config,
            Arc::new(move |job| handle(job, &*store, &*mailer, &*sms)),
        )
    }
}

fn handle<S: OrderStore + UserDirectory>(
    job: &Job,
    store: &S,
    mailer: &dyn Mailer,
    sms: &dyn SmsGateway,
) -> Result<(), JobError> {
    let kind = NotificationKind::from_job_name(&job.name)
        .ok_or_else(|| JobError::fatal(format!("unknown notification job '{}'", job.name)))?;

    let payload: NotificationJob = serde_json::from_value(job.payload.clone())
        .map_err(|e| JobError::fatal(format!("malformed notification payload: {e}")))?;

    let order = store
        .get_order(payload.order_id)
        .map_err(|e| JobError::retryable(e.to_string()))?
        .ok_or_else(|| JobError::fatal(format!("order {} not found", payload.order_id)))?;

    let user = store
        .get_user(payload.user_id)
        .map_err(|e| JobError::retryable(e.to_string()))?
        .ok_or_else(|| JobError::fatal(format!("user {} not found", payload.user_id)))?;

    match kind {
        NotificationKind::OrderConfirmation => {
            let subject = format!("Order {} confirmed", order.order_number);
            let body = format!(
                "Hi {}, your order {} for {} is confirmed and being prepared.",
                user.name, order.order_number, order.total_amount
            );

            if let Some(email) = &user.email {
                mailer
                    .send_email(email, &subject, &body)
                    .map_err(|e| JobError::retryable(e.to_string()))?;
            }
            if let Some(phone) = &user.phone {
                sms.send_sms(phone, &body)
                    .map_err(|e| JobError::retryable(e.to_string()))?;
            }
            if user.email.is_none() && user.phone.is_none() {
                warn!(
                    user_id = %user.id,
                    order_id = %order.id,
                    "user has no contact points; confirmation dropped"
                );
            }
        }
        NotificationKind::PaymentFailed => {
            let reason = payload.reason.as_deref().unwrap_or("payment declined");
            let subject = format!("Payment failed for order {}", order.order_number);
            let body = format!(
                "Hi {}, we could not collect payment for order {}: {}. \
                 Please update your payment method and try again.",
                user.name, order.order_number, reason
            );

            if let Some(email) = &user.email {
                mailer
                    .send_email(email, &subject, &body)
                    .map_err(|e| JobError::retryable(e.to_string()))?;
            } else {
                warn!(
                    user_id = %user.id,
                    order_id = %order.id,
                    "user has no email; payment-failed notice dropped"
                );
            }
        }
    }

    info!(
        order_id = %order.id,
        user_id = %user.id,
        kind = ?kind,
        "notification delivered"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use orderflow_auth::User;
    use orderflow_cart::{Cart, CartItem, CartStore};
    use orderflow_core::{Money, ProductId, UserId};
    use orderflow_orders::{Order, PaymentMethod, assemble};
    use orderflow_queue::EnqueueOptions;

    use crate::jobs::{ORDER_CONFIRMATION, PAYMENT_FAILED};
    use crate::notify::doubles::{RecordingMailer, RecordingSms};
    use crate::store::InMemoryStore;

    fn committed_order(store: &InMemoryStore, user: &User) -> Order {
        let mut cart = Cart::new(user.id);
        let item = CartItem::new(cart.id, ProductId::new(), None, 1, Money::from_major(20));
        cart.total_amount = item.subtotal;
        store.insert_cart(&cart).unwrap();
        store.insert_cart_item(&item).unwrap();
        let aggregate = assemble(
            &cart,
            &[item],
            store.next_order_sequence().unwrap(),
            PaymentMethod::Card,
            None,
        )
        .unwrap();
        store.commit_checkout(&aggregate).unwrap();
        aggregate.order
    }

    fn notification_job(name: &str, order: &Order, reason: Option<&str>) -> Job {
        let payload = NotificationJob {
            order_id: order.id,
            user_id: order.user_id,
            reason: reason.map(String::from),
        };
        let mut job = Job::new(
            NOTIFICATION_QUEUE,
            name,
            serde_json::to_value(&payload).unwrap(),
            EnqueueOptions::default(),
        );
        job.mark_active();
        job
    }

    #[test]
    fn confirmation_goes_to_email_and_sms() {
        let store = InMemoryStore::new();
        let user = User::new("Asha")
            .with_email("asha@example.com")
            .with_phone("+15550100");
        store.insert_user(&user);
        let order = committed_order(&store, &user);

        let mailer = RecordingMailer::default();
        let sms = RecordingSms::default();
        let job = notification_job(ORDER_CONFIRMATION, &order, None);
        handle(&job, &store, &mailer, &sms).unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "asha@example.com");
        assert!(sent[0].1.contains(order.order_number.as_str()));
        assert_eq!(sms.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn payment_failure_uses_email_only() {
        let store = InMemoryStore::new();
        let user = User::new("Asha")
            .with_email("asha@example.com")
            .with_phone("+15550100");
        store.insert_user(&user);
        let order = committed_order(&store, &user);

        let mailer = RecordingMailer::default();
        let sms = RecordingSms::default();
        let job = notification_job(PAYMENT_FAILED, &order, Some("card declined"));
        handle(&job, &store, &mailer, &sms).unwrap();

        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
        assert!(sms.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn missing_contact_points_skip_channels_without_failing() {
        let store = InMemoryStore::new();
        let user = User::new("Asha");
        store.insert_user(&user);
        let order = committed_order(&store, &user);

        let mailer = RecordingMailer::default();
        let sms = RecordingSms::default();
        let job = notification_job(ORDER_CONFIRMATION, &order, None);
        handle(&job, &store, &mailer, &sms).unwrap();

        assert!(mailer.sent.lock().unwrap().is_empty());
        assert!(sms.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn transport_failure_is_retryable() {
        let store = InMemoryStore::new();
        let user = User::new("Asha").with_email("asha@example.com");
        store.insert_user(&user);
        let order = committed_order(&store, &user);

        let mailer = RecordingMailer {
            fail: true,
            ..Default::default()
        };
        let sms = RecordingSms::default();
        let job = notification_job(ORDER_CONFIRMATION, &order, None);
        let err = handle(&job, &store, &mailer, &sms).unwrap_err();
        assert!(!err.is_fatal());
    }

    #[test]
    fn unknown_job_name_is_fatal() {
        let store = InMemoryStore::new();
        let user = User::new("Asha");
        store.insert_user(&user);
        let order = committed_order(&store, &user);

        let mailer = RecordingMailer::default();
        let sms = RecordingSms::default();
        let job = notification_job("order-shipped", &order, None);
        let err = handle(&job, &store, &mailer, &sms).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn missing_order_is_fatal() {
        let store = InMemoryStore::new();
        let user = User::new("Asha").with_email("asha@example.com");
        store.insert_user(&user);
        let mut order = committed_order(&store, &user);
        order.id = orderflow_core::OrderId::new();

        let mailer = RecordingMailer::default();
        let sms = RecordingSms::default();
        let job = notification_job(ORDER_CONFIRMATION, &order, None);
        let err = handle(&job, &store, &mailer, &sms).unwrap_err();
        assert!(err.is_fatal());
    }
}
