//! Worker pools: bounded concurrency, rate limiting, graceful shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::queue::JobQueue;
use crate::types::{Job, JobError};

/// Job handler invoked once per dequeued job.
pub type JobHandler = Arc<dyn Fn(&Job) -> Result<(), JobError> + Send + Sync>;

/// Max jobs admitted per window, shared across a pool's threads. Protects
/// downstream dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub max_jobs: u32,
    pub per: Duration,
}

impl RateLimit {
    pub fn per_second(max_jobs: u32) -> Self {
        Self {
            max_jobs,
            per: Duration::from_secs(1),
        }
    }
}

/// Windowed limiter shared by all threads of one pool.
struct Limiter {
    limit: RateLimit,
    window: Mutex<(Instant, u32)>,
}

impl Limiter {
    fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            window: Mutex::new((Instant::now(), 0)),
        }
    }

    fn try_acquire(&self) -> bool {
        let mut window = self.window.lock().unwrap();
        let (started, count) = *window;
        if started.elapsed() >= self.limit.per {
            *window = (Instant::now(), 1);
            return true;
        }
        if count < self.limit.max_jobs {
            window.1 += 1;
            return true;
        }
        false
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pool name, for logging and thread names.
    pub name: String,
    /// Named queue to consume.
    pub queue: String,
    /// Concurrent jobs processed by this pool.
    pub concurrency: usize,
    /// Optional shared rate limiter.
    pub rate_limit: Option<RateLimit>,
    /// How often an idle thread re-polls the queue.
    pub poll_interval: Duration,
}

impl WorkerConfig {
    pub fn new(name: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: queue.into(),
            concurrency: 1,
            rate_limit: None,
            poll_interval: Duration::from_millis(20),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Pool runtime statistics.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct WorkerStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
}

/// Handle to control and join a running pool.
pub struct WorkerHandle {
    shutdown: Arc<AtomicBool>,
    joins: Vec<thread::JoinHandle<()>>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for every thread to stop. In-flight
    /// handlers run to completion.
    pub fn shutdown(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        for join in self.joins.drain(..) {
            let _ = join.join();
        }
    }

    pub fn stats(&self) -> WorkerStats {
        *self.stats.lock().unwrap()
    }
}

/// Spawns pools of consumer threads over a [`JobQueue`].
pub struct Worker;

impl Worker {
    /// Register a worker pool on a named queue.
    ///
    /// `config.concurrency` threads poll the queue; each claimed job is run
    /// through `handler`, then settled as completed or failed (which applies
    /// the job's retry policy).
    pub fn spawn(queue: Arc<JobQueue>, config: WorkerConfig, handler: JobHandler) -> WorkerHandle {
        let shutdown = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(WorkerStats::default()));
        let limiter = config.rate_limit.map(|limit| Arc::new(Limiter::new(limit)));

        info!(
            worker = %config.name,
            queue = %config.queue,
            concurrency = config.concurrency,
            "worker pool started"
        );

        let joins = (0..config.concurrency)
            .map(|slot| {
                let queue = queue.clone();
                let config = config.clone();
                let handler = handler.clone();
                let shutdown = shutdown.clone();
                let stats = stats.clone();
                let limiter = limiter.clone();

                thread::Builder::new()
                    .name(format!("{}-{slot}", config.name))
                    .spawn(move || {
                        consumer_loop(&queue, &config, &handler, &shutdown, &stats, limiter)
                    })
                    .expect("failed to spawn worker thread")
            })
            .collect();

        WorkerHandle {
            shutdown,
            joins,
            stats,
        }
    }
}

fn consumer_loop(
    queue: &JobQueue,
    config: &WorkerConfig,
    handler: &JobHandler,
    shutdown: &AtomicBool,
    stats: &Mutex<WorkerStats>,
    limiter: Option<Arc<Limiter>>,
) {
    while !shutdown.load(Ordering::SeqCst) {
        if queue.is_closed() {
            break;
        }

        if let Some(limiter) = &limiter {
            if !limiter.try_acquire() {
                thread::sleep(config.poll_interval);
                continue;
            }
        }

        let Some(job) = queue.claim_next(&config.queue) else {
            thread::sleep(config.poll_interval);
            continue;
        };

        debug!(
            worker = %config.name,
            job_id = %job.id,
            job_name = %job.name,
            attempt = job.attempts_made,
            "claimed job"
        );

        let result = handler(&job);

        {
            let mut stats = stats.lock().unwrap();
            stats.jobs_processed += 1;
            match result {
                Ok(()) => stats.jobs_succeeded += 1,
                Err(_) => stats.jobs_failed += 1,
            }
        }

        match result {
            Ok(()) => queue.complete(job.id),
            Err(err) => {
                warn!(
                    worker = %config.name,
                    job_id = %job.id,
                    error = %err,
                    "job handler failed"
                );
                queue.fail(job.id, &err);
            }
        }
    }

    debug!(worker = %config.name, "worker thread stopped");
}
