//! Payment settlement worker.
//!
//! Consumes `process-payment` jobs, drives the payment and order state
//! machines, and fans out the buyer notification. The handler is idempotent
//! and self-healing: a redelivered job whose payment already reached a
//! terminal status first reconciles the order side (the payment and order
//! records are written in separate steps, so a redelivery may find the
//! payment settled but the order not yet caught up), then acks.

use std::sync::Arc;

use tracing::{error, info, warn};

use orderflow_orders::{Order, OrderStatus, OrderStore, PaymentStatus};
use orderflow_queue::{
    EnqueueOptions, Job, JobError, JobQueue, Priority, RateLimit, Worker, WorkerConfig,
    WorkerHandle,
};

use crate::gateway::PaymentGateway;
use crate::jobs::{
    NOTIFICATION_QUEUE, ORDER_CONFIRMATION, PAYMENT_FAILED, PAYMENT_QUEUE, NotificationJob,
    PaymentJob,
};

/// Spawns the settlement worker pool.
pub struct PaymentWorker;

impl PaymentWorker {
    /// Production-shaped pool: ten concurrent settlements, 100 jobs/s.
    pub fn default_config() -> WorkerConfig {
        WorkerConfig::new("payment-worker", PAYMENT_QUEUE)
            .with_concurrency(10)
            .with_rate_limit(RateLimit::per_second(100))
    }

    pub fn spawn<S, G>(
        store: Arc<S>,
        queue: Arc<JobQueue>,
        gateway: Arc<G>,
        config: WorkerConfig,
    ) -> WorkerHandle
    where
        S: OrderStore + 'static,
        G: PaymentGateway + 'static,
    {
        let handler_queue = queue.clone();
        Worker::spawn(
            queue,
            config,
            Arc::new(move |job| handle(job, &*store, &handler_queue, &*gateway)),
        )
    }
}

fn handle<S: OrderStore>(
    job: &Job,
    store: &S,
    queue: &JobQueue,
    gateway: &dyn PaymentGateway,
) -> Result<(), JobError> {
    let payload: PaymentJob = serde_json::from_value(job.payload.clone())
        .map_err(|e| JobError::fatal(format!("malformed payment payload: {e}")))?;

    let mut payment = store
        .get_payment(payload.payment_id)
        .map_err(|e| JobError::retryable(e.to_string()))?
        .ok_or_else(|| JobError::fatal(format!("payment {} not found", payload.payment_id)))?;

    let mut order = store
        .get_order(payload.order_id)
        .map_err(|e| JobError::retryable(e.to_string()))?
        .ok_or_else(|| JobError::fatal(format!("order {} not found", payload.order_id)))?;

    // Redelivery after the payment write landed but before the job was acked.
    // The order may still be mid-flight; finish its side before acking.
    if payment.status.is_terminal() {
        return reconcile_terminal(&payment, order, store, queue);
    }

    if payment.status == PaymentStatus::Pending {
        payment
            .set_status(PaymentStatus::Processing)
            .map_err(|e| JobError::fatal(e.to_string()))?;
        store
            .update_payment(&payment)
            .map_err(|e| JobError::retryable(e.to_string()))?;
    }

    // Mirrored separately from the payment write so a redelivery heals a
    // half-applied first attempt.
    if order.payment_status == PaymentStatus::Pending {
        order
            .set_payment_status(PaymentStatus::Processing)
            .map_err(|e| JobError::fatal(e.to_string()))?;
        store
            .update_order(&order)
            .map_err(|e| JobError::retryable(e.to_string()))?;
    }

    match gateway.settle(&payment) {
        Ok(transaction_id) => {
            payment
                .set_status(PaymentStatus::Completed)
                .map_err(|e| JobError::fatal(e.to_string()))?;
            payment.transaction_id = Some(transaction_id);
            store
                .update_payment(&payment)
                .map_err(|e| JobError::retryable(e.to_string()))?;

            confirm_order(order, store, queue)
        }
        Err(gateway_err) => {
            warn!(
                payment_id = %payment.id,
                order_id = %order.id,
                attempt = job.attempts_made,
                error = %gateway_err,
                "gateway declined settlement"
            );

            // Retries still remain: leave the payment processing and let the
            // queue redeliver with backoff.
            if !job.is_final_attempt() {
                return Err(JobError::retryable(gateway_err.to_string()));
            }

            // Last attempt: record the failure and tell the buyer, exactly
            // once per payment.
            payment
                .set_status(PaymentStatus::Failed)
                .map_err(|e| JobError::fatal(e.to_string()))?;
            store
                .update_payment(&payment)
                .map_err(|e| JobError::retryable(e.to_string()))?;

            record_failure(order, Some(gateway_err.to_string()), store, queue)?;

            Err(JobError::retryable(gateway_err.to_string()))
        }
    }
}

/// Settle the order side for a payment that is already terminal.
///
/// The notification is enqueued in the same step that persists the order, so
/// a mirrored order means the buyer was already told; only an unmirrored one
/// still owes the order transitions and the notice.
fn reconcile_terminal<S: OrderStore>(
    payment: &orderflow_orders::Payment,
    order: Order,
    store: &S,
    queue: &JobQueue,
) -> Result<(), JobError> {
    if order.payment_status == payment.status {
        info!(
            payment_id = %payment.id,
            status = ?payment.status,
            "payment already settled; acknowledging redelivery"
        );
        return Ok(());
    }

    match payment.status {
        PaymentStatus::Completed => {
            info!(
                payment_id = %payment.id,
                order_id = %order.id,
                "completing interrupted order confirmation"
            );
            confirm_order(order, store, queue)
        }
        PaymentStatus::Failed => {
            info!(
                payment_id = %payment.id,
                order_id = %order.id,
                "completing interrupted failure record"
            );
            record_failure(order, None, store, queue)
        }
        // Refunds are driven manually, never by this worker.
        _ => Ok(()),
    }
}

fn confirm_order<S: OrderStore>(
    mut order: Order,
    store: &S,
    queue: &JobQueue,
) -> Result<(), JobError> {
    if order.status != OrderStatus::Confirmed {
        order
            .set_status(OrderStatus::Confirmed)
            .map_err(|e| JobError::fatal(e.to_string()))?;
    }
    mirror_payment_status(&mut order, PaymentStatus::Completed)?;
    store
        .update_order(&order)
        .map_err(|e| JobError::retryable(e.to_string()))?;

    info!(
        order_id = %order.id,
        order_number = %order.order_number,
        "payment settled; order confirmed"
    );

    let notification = NotificationJob {
        order_id: order.id,
        user_id: order.user_id,
        reason: None,
    };
    if let Err(err) = queue.enqueue(
        NOTIFICATION_QUEUE,
        ORDER_CONFIRMATION,
        &notification,
        EnqueueOptions::with_priority(Priority::High),
    ) {
        // The settlement itself succeeded; a dropped confirmation email must
        // not fail the job.
        error!(
            order_id = %order.id,
            error = %err,
            "failed to enqueue order confirmation"
        );
    }

    Ok(())
}

fn record_failure<S: OrderStore>(
    mut order: Order,
    reason: Option<String>,
    store: &S,
    queue: &JobQueue,
) -> Result<(), JobError> {
    mirror_payment_status(&mut order, PaymentStatus::Failed)?;
    store
        .update_order(&order)
        .map_err(|e| JobError::retryable(e.to_string()))?;

    let notification = NotificationJob {
        order_id: order.id,
        user_id: order.user_id,
        reason,
    };
    if let Err(err) = queue.enqueue(
        NOTIFICATION_QUEUE,
        PAYMENT_FAILED,
        &notification,
        EnqueueOptions::with_priority(Priority::Medium),
    ) {
        error!(
            order_id = %order.id,
            error = %err,
            "failed to enqueue payment-failed notification"
        );
    }

    Ok(())
}

/// Step `Order.payment_status` through the transition table to `to`, passing
/// through `processing` when the first attempt's mirror write never landed.
fn mirror_payment_status(order: &mut Order, to: PaymentStatus) -> Result<(), JobError> {
    if order.payment_status == to {
        return Ok(());
    }
    if order.payment_status == PaymentStatus::Pending {
        order
            .set_payment_status(PaymentStatus::Processing)
            .map_err(|e| JobError::fatal(e.to_string()))?;
    }
    if order.payment_status != to {
        order
            .set_payment_status(to)
            .map_err(|e| JobError::fatal(e.to_string()))?;
    }
    Ok(())
}
