//! The broker-facing queue client.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::types::{EnqueueOptions, Job, JobError, JobId, JobState};

/// Producer-side failure. The caller decides whether this is fatal; checkout
/// deliberately logs and continues.
#[derive(Debug, Error)]
pub enum EnqueueError {
    #[error("queue client is closed")]
    Closed,

    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Housekeeping policy for terminal jobs. Bounds observability data; not a
/// correctness requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Completed jobs older than this are purged.
    pub completed_max_age: Duration,
    /// At most this many completed jobs are kept per queue (newest win).
    pub completed_max_count: usize,
    /// Failed jobs are kept longer for diagnosis, then purged.
    pub failed_max_age: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            completed_max_age: Duration::from_secs(3600),
            completed_max_count: 1000,
            failed_max_age: Duration::from_secs(86400),
        }
    }
}

/// Per-queue job counts, for health reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
    pub delayed: usize,
}

impl QueueCounts {
    pub fn total(&self) -> usize {
        self.waiting + self.active + self.completed + self.failed + self.delayed
    }
}

/// Snapshot of the whole client for health endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub queues: BTreeMap<String, QueueCounts>,
    pub timestamp: DateTime<Utc>,
}

/// Durable, prioritized, retryable work queue keyed by named queues.
///
/// Explicitly constructed and passed to every producer/consumer; there is no
/// ambient global instance. `close()` ends the lifecycle: enqueues fail and
/// claims return nothing.
pub struct JobQueue {
    jobs: Mutex<HashMap<JobId, Job>>,
    closed: AtomicBool,
    retention: RetentionPolicy,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::with_retention(RetentionPolicy::default())
    }

    pub fn with_retention(retention: RetentionPolicy) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            retention,
        }
    }

    /// Stop accepting work. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!("job queue client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Enqueue a job onto a named queue.
    pub fn enqueue<T: Serialize>(
        &self,
        queue: &str,
        name: &str,
        payload: &T,
        options: EnqueueOptions,
    ) -> Result<JobId, EnqueueError> {
        if self.is_closed() {
            return Err(EnqueueError::Closed);
        }

        let payload = serde_json::to_value(payload)?;
        let job = Job::new(queue, name, payload, options);
        let id = job.id;

        debug!(job_id = %id, queue, job_name = %job.name, priority = job.priority.weight(), "job enqueued");

        let mut jobs = self.jobs.lock().unwrap();
        jobs.insert(id, job);
        Ok(id)
    }

    /// Claim the highest-priority ready job on `queue`, oldest first within a
    /// priority tier. Returns `None` when nothing is due or the client is
    /// closed.
    pub fn claim_next(&self, queue: &str) -> Option<Job> {
        if self.is_closed() {
            return None;
        }

        let now = Utc::now();
        let mut jobs = self.jobs.lock().unwrap();

        let next_id = jobs
            .values()
            .filter(|j| j.queue == queue && j.is_ready(now))
            .max_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            })
            .map(|j| j.id)?;

        let job = jobs.get_mut(&next_id)?;
        job.mark_active();
        Some(job.clone())
    }

    /// Record a successful delivery.
    pub fn complete(&self, job_id: JobId) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(&job_id) {
            job.mark_completed();
            info!(job_id = %job_id, queue = %job.queue, job_name = %job.name, "job completed");
            let queue = job.queue.clone();
            Self::sweep_queue(&mut jobs, &queue, &self.retention, Utc::now());
        }
    }

    /// Record a failed delivery; schedules the retry or parks the job.
    pub fn fail(&self, job_id: JobId, err: &JobError) {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(&job_id) {
            job.mark_failed(err);
            match &job.state {
                JobState::Failed { attempts, .. } => {
                    error!(
                        job_id = %job_id,
                        queue = %job.queue,
                        job_name = %job.name,
                        attempts,
                        error = %err,
                        "job failed permanently"
                    );
                }
                _ => {
                    debug!(
                        job_id = %job_id,
                        queue = %job.queue,
                        attempt = job.attempts_made,
                        error = %err,
                        "job failed; retry scheduled"
                    );
                }
            }
        }
    }

    pub fn get_job(&self, job_id: JobId) -> Option<Job> {
        self.jobs.lock().unwrap().get(&job_id).cloned()
    }

    /// Current counts for one named queue.
    pub fn counts(&self, queue: &str) -> QueueCounts {
        let jobs = self.jobs.lock().unwrap();
        let mut counts = QueueCounts::default();
        for job in jobs.values().filter(|j| j.queue == queue) {
            match job.state {
                JobState::Waiting => counts.waiting += 1,
                JobState::Active => counts.active += 1,
                JobState::Delayed => counts.delayed += 1,
                JobState::Completed => counts.completed += 1,
                JobState::Failed { .. } => counts.failed += 1,
            }
        }
        counts
    }

    /// Counts for every queue that currently holds jobs.
    pub fn health(&self) -> HealthReport {
        let jobs = self.jobs.lock().unwrap();
        let mut queues: BTreeMap<String, QueueCounts> = BTreeMap::new();
        for job in jobs.values() {
            let counts = queues.entry(job.queue.clone()).or_default();
            match job.state {
                JobState::Waiting => counts.waiting += 1,
                JobState::Active => counts.active += 1,
                JobState::Delayed => counts.delayed += 1,
                JobState::Completed => counts.completed += 1,
                JobState::Failed { .. } => counts.failed += 1,
            }
        }
        HealthReport {
            status: if self.is_closed() { "closed" } else { "healthy" },
            queues,
            timestamp: Utc::now(),
        }
    }

    /// Apply the retention policy to every queue.
    pub fn sweep(&self) {
        let mut jobs = self.jobs.lock().unwrap();
        let queues: Vec<String> = {
            let mut names: Vec<String> = jobs.values().map(|j| j.queue.clone()).collect();
            names.sort();
            names.dedup();
            names
        };
        let now = Utc::now();
        for queue in queues {
            Self::sweep_queue(&mut jobs, &queue, &self.retention, now);
        }
    }

    fn sweep_queue(
        jobs: &mut HashMap<JobId, Job>,
        queue: &str,
        retention: &RetentionPolicy,
        now: DateTime<Utc>,
    ) {
        let completed_cutoff = now
            - chrono::Duration::from_std(retention.completed_max_age).unwrap_or_default();
        let failed_cutoff =
            now - chrono::Duration::from_std(retention.failed_max_age).unwrap_or_default();

        let mut completed: Vec<(JobId, DateTime<Utc>)> = Vec::new();
        let mut purge: Vec<JobId> = Vec::new();

        for job in jobs.values() {
            if job.queue != queue {
                continue;
            }
            match &job.state {
                JobState::Completed => {
                    if job.updated_at < completed_cutoff {
                        purge.push(job.id);
                    } else {
                        completed.push((job.id, job.updated_at));
                    }
                }
                JobState::Failed { .. } => {
                    if job.updated_at < failed_cutoff {
                        purge.push(job.id);
                    }
                }
                _ => {}
            }
        }

        // Keep only the newest N completed jobs.
        if completed.len() > retention.completed_max_count {
            completed.sort_by_key(|&(_, at)| std::cmp::Reverse(at));
            purge.extend(
                completed[retention.completed_max_count..]
                    .iter()
                    .map(|&(id, _)| id),
            );
        }

        for id in purge {
            jobs.remove(&id);
        }
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}
