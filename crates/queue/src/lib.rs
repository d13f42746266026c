//! `orderflow-queue` — durable, prioritized, retryable work queue.
//!
//! ## Design
//!
//! - Named queues with per-job numeric priority (higher dequeues first)
//! - Retry policy with exponential backoff; fatal errors park immediately
//! - Bounded retention for completed/failed jobs (housekeeping, not
//!   correctness)
//! - Per-queue waiting/active/completed/failed/delayed counts and a health
//!   report
//! - Explicitly constructed client with a `close()` lifecycle, passed to
//!   every component that needs it — never ambient module state
//!
//! ## Components
//!
//! - `Job`: unit of asynchronous work with payload, priority, retry policy
//! - `JobQueue`: the broker-facing client (enqueue, claim, settle, counts)
//! - `Worker`: thread pool with bounded concurrency and a rate limiter

pub mod queue;
pub mod types;
pub mod worker;

pub use queue::{EnqueueError, HealthReport, JobQueue, QueueCounts, RetentionPolicy};
pub use types::{
    BackoffStrategy, EnqueueOptions, Job, JobError, JobId, JobState, Priority, RetryPolicy,
};
pub use worker::{JobHandler, RateLimit, Worker, WorkerConfig, WorkerHandle, WorkerStats};
