use std::sync::Arc;
use std::time::Duration;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use orderflow_core::{Money, OrderId, PaymentId};
use orderflow_infra::jobs::{PAYMENT_QUEUE, PROCESS_PAYMENT, PaymentData, PaymentJob};
use orderflow_orders::PaymentMethod;
use orderflow_queue::{EnqueueOptions, JobQueue, Priority, RetentionPolicy};

fn payload() -> PaymentJob {
    PaymentJob {
        payment_id: PaymentId::new(),
        order_id: OrderId::new(),
        payment_data: PaymentData {
            method: PaymentMethod::Card,
            amount: Money::from_major(20),
        },
    }
}

fn bench_enqueue(c: &mut Criterion) {
    let queue = JobQueue::with_retention(RetentionPolicy {
        completed_max_age: Duration::from_secs(3600),
        completed_max_count: 10_000,
        failed_max_age: Duration::from_secs(3600),
    });
    let job = payload();

    c.bench_function("enqueue_high_priority", |b| {
        b.iter(|| {
            queue
                .enqueue(
                    PAYMENT_QUEUE,
                    PROCESS_PAYMENT,
                    black_box(&job),
                    EnqueueOptions::with_priority(Priority::High),
                )
                .unwrap()
        })
    });
}

fn bench_claim_with_mixed_priorities(c: &mut Criterion) {
    c.bench_function("claim_next_among_1000_jobs", |b| {
        b.iter_with_setup(
            || {
                let queue = Arc::new(JobQueue::new());
                let job = payload();
                for i in 0..1000 {
                    let priority = match i % 3 {
                        0 => Priority::High,
                        1 => Priority::Medium,
                        _ => Priority::Low,
                    };
                    queue
                        .enqueue(
                            PAYMENT_QUEUE,
                            PROCESS_PAYMENT,
                            &job,
                            EnqueueOptions::with_priority(priority),
                        )
                        .unwrap();
                }
                queue
            },
            |queue| black_box(queue.claim_next(PAYMENT_QUEUE)),
        )
    });
}

fn bench_settle_cycle(c: &mut Criterion) {
    let queue = JobQueue::new();
    let job = payload();

    c.bench_function("enqueue_claim_complete_cycle", |b| {
        b.iter(|| {
            queue
                .enqueue(
                    PAYMENT_QUEUE,
                    PROCESS_PAYMENT,
                    &job,
                    EnqueueOptions::default(),
                )
                .unwrap();
            let claimed = queue.claim_next(PAYMENT_QUEUE).unwrap();
            queue.complete(claimed.id);
        })
    });
}

criterion_group!(
    benches,
    bench_enqueue,
    bench_claim_with_mixed_priorities,
    bench_settle_cycle
);
criterion_main!(benches);
