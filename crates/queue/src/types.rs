//! Core job types and policies.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Numeric ordering hint: higher dequeues first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub const fn weight(self) -> u8 {
        match self {
            Priority::High => 20,
            Priority::Medium => 10,
            Priority::Low => 1,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Medium
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.weight().cmp(&other.weight())
    }
}

/// Job execution state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Queued, waiting to be claimed.
    Waiting,
    /// Claimed by a worker, handler running.
    Active,
    /// Failed, retry scheduled after backoff.
    Delayed,
    /// Handler returned success.
    Completed,
    /// Parked: attempts exhausted or a fatal error. Retained for diagnosis,
    /// then purged by retention.
    Failed { error: String, attempts: u32 },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed { .. })
    }
}

/// Backoff strategy between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Fixed delay between retries.
    Fixed,
    /// Exponential backoff: base * 2^(attempt-1).
    Exponential,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts allowed (first delivery included).
    pub max_attempts: u32,
    /// Base delay between retries.
    pub base_delay: Duration,
    /// Maximum delay cap.
    pub max_delay: Duration,
    /// Backoff strategy.
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            max_delay: Duration::from_secs(60),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Policy with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Policy with fixed delays.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    /// Policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    /// Delay before the retry following `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = self.base_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;

        let delay_ms = match self.strategy {
            BackoffStrategy::Fixed => base_ms,
            BackoffStrategy::Exponential => base_ms.saturating_mul(1u64 << (attempt - 1).min(32)),
        };

        Duration::from_millis(delay_ms.min(max_ms))
    }
}

/// Per-enqueue overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub priority: Priority,
    pub retry_policy: RetryPolicy,
}

impl EnqueueOptions {
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority,
            ..Default::default()
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

/// Error returned by a job handler.
///
/// `Retryable` requeues per the job's backoff policy until attempts are
/// exhausted; `Fatal` parks the job immediately (retrying cannot help, e.g. a
/// referenced record has vanished).
#[derive(Debug, Error)]
pub enum JobError {
    #[error("{0}")]
    Retryable(String),

    #[error("fatal: {0}")]
    Fatal(String),
}

impl JobError {
    pub fn retryable(msg: impl Into<String>) -> Self {
        Self::Retryable(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, JobError::Fatal(_))
    }
}

/// A unit of asynchronous work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job ID.
    pub id: JobId,
    /// Named queue this job belongs to.
    pub queue: String,
    /// Job name, used by consumers to route/branch.
    pub name: String,
    /// JSON payload: primitive identifiers and enums only, never object
    /// references.
    pub payload: serde_json::Value,
    /// Dequeue ordering hint.
    pub priority: Priority,
    /// Retry policy.
    pub retry_policy: RetryPolicy,
    /// Deliveries so far (incremented at claim).
    pub attempts_made: u32,
    /// Current state.
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When a delayed retry becomes due.
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        queue: impl Into<String>,
        name: impl Into<String>,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            queue: queue.into(),
            name: name.into(),
            payload,
            priority: options.priority,
            retry_policy: options.retry_policy,
            attempts_made: 0,
            state: JobState::Waiting,
            created_at: now,
            updated_at: now,
            scheduled_at: None,
        }
    }

    /// Ready to be claimed (waiting, or a delayed retry that is due).
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        match self.state {
            JobState::Waiting => true,
            JobState::Delayed => self.scheduled_at.is_none_or(|at| now >= at),
            _ => false,
        }
    }

    /// True while handling the last allowed delivery.
    pub fn is_final_attempt(&self) -> bool {
        self.attempts_made >= self.retry_policy.max_attempts
    }

    /// Claimed by a worker: one delivery begins.
    pub fn mark_active(&mut self) {
        self.state = JobState::Active;
        self.attempts_made += 1;
        self.updated_at = Utc::now();
    }

    pub fn mark_completed(&mut self) {
        self.state = JobState::Completed;
        self.updated_at = Utc::now();
    }

    /// Record a failed delivery: schedule a retry with backoff, or park the
    /// job when attempts are exhausted or the error is fatal.
    pub fn mark_failed(&mut self, error: &JobError) {
        let now = Utc::now();
        self.updated_at = now;

        if error.is_fatal() || self.attempts_made >= self.retry_policy.max_attempts {
            self.state = JobState::Failed {
                error: error.to_string(),
                attempts: self.attempts_made,
            };
            self.scheduled_at = None;
        } else {
            let delay = self.retry_policy.delay_for_attempt(self.attempts_made);
            self.scheduled_at =
                Some(now + chrono::Duration::from_std(delay).unwrap_or_default());
            self.state = JobState::Delayed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_by_weight() {
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
        assert_eq!(Priority::High.weight(), 20);
        assert_eq!(Priority::Medium.weight(), 10);
        assert_eq!(Priority::Low.weight(), 1);
    }

    #[test]
    fn exponential_backoff_doubles_from_base() {
        let policy = RetryPolicy::exponential(3, Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(8000));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            strategy: BackoffStrategy::Exponential,
        };
        assert_eq!(policy.delay_for_attempt(9), Duration::from_secs(60));
    }

    #[test]
    fn fixed_backoff_is_constant() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
    }

    #[test]
    fn job_lifecycle() {
        let mut job = Job::new(
            "payments",
            "process-payment",
            serde_json::json!({"key": "value"}),
            EnqueueOptions::default(),
        );

        assert_eq!(job.state, JobState::Waiting);
        assert_eq!(job.attempts_made, 0);

        job.mark_active();
        assert_eq!(job.state, JobState::Active);
        assert_eq!(job.attempts_made, 1);

        job.mark_completed();
        assert_eq!(job.state, JobState::Completed);
        assert!(job.state.is_terminal());
    }

    #[test]
    fn retryable_failure_delays_then_parks() {
        let mut job = Job::new(
            "payments",
            "process-payment",
            serde_json::json!({}),
            EnqueueOptions::default().with_retry_policy(RetryPolicy::exponential(
                2,
                Duration::from_millis(10),
            )),
        );

        job.mark_active();
        job.mark_failed(&JobError::retryable("gateway timeout"));
        assert_eq!(job.state, JobState::Delayed);
        assert!(job.scheduled_at.is_some());
        assert!(!job.is_final_attempt());

        job.mark_active();
        assert!(job.is_final_attempt());
        job.mark_failed(&JobError::retryable("gateway timeout"));
        match &job.state {
            JobState::Failed { attempts, .. } => assert_eq!(*attempts, 2),
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn fatal_failure_parks_on_first_attempt() {
        let mut job = Job::new(
            "payments",
            "process-payment",
            serde_json::json!({}),
            EnqueueOptions::default(),
        );

        job.mark_active();
        job.mark_failed(&JobError::fatal("payment record vanished"));
        match &job.state {
            JobState::Failed { error, attempts } => {
                assert_eq!(*attempts, 1);
                assert!(error.contains("payment record vanished"));
            }
            other => panic!("expected Failed, got {other:?}"),
        }
    }

    #[test]
    fn delayed_job_becomes_ready_when_due() {
        let mut job = Job::new(
            "payments",
            "process-payment",
            serde_json::json!({}),
            EnqueueOptions::default(),
        );
        job.mark_active();
        job.mark_failed(&JobError::retryable("transient"));

        let now = Utc::now();
        assert!(!job.is_ready(now));
        let later = now + chrono::Duration::seconds(10);
        assert!(job.is_ready(later));
    }
}
