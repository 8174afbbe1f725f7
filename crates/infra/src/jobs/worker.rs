//! Worker pool: concurrent claim → execute → report loops over a [`JobQueue`].

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

use super::queue::{JobQueue, QueueError};
use super::types::Job;

/// Application-supplied processing routine.
#[async_trait]
pub trait JobProcessor: Send + Sync + 'static {
    /// Process one job. `Ok` completes it with the returned result; `Err`
    /// fails it with the error's description.
    async fn process(&self, job: &Job) -> Result<serde_json::Value, JobError>;
}

/// Error raised by a [`JobProcessor`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("{0}")]
    Failed(String),
}

impl JobError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Adapts an async closure into a [`JobProcessor`].
pub struct FnProcessor<F>(pub F);

#[async_trait]
impl<F, Fut> JobProcessor for FnProcessor<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<serde_json::Value, JobError>> + Send + 'static,
{
    async fn process(&self, job: &Job) -> Result<serde_json::Value, JobError> {
        (self.0)(job.clone()).await
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers
    pub workers: usize,
    /// Upper bound on how long an idle worker sleeps between claim attempts
    pub poll_interval: Duration,
    /// Optional execution limit per job
    pub job_timeout: Option<Duration>,
    /// Name for logging
    pub name: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            poll_interval: Duration::from_millis(500),
            job_timeout: None,
            name: "file-workers".to_string(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }
}

/// Worker pool runtime statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct WorkerStats {
    pub jobs_processed: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub current_running: usize,
}

/// Handle to control a running pool.
#[derive(Debug)]
pub struct WorkerPoolHandle {
    shutdown: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
    stats: Arc<Mutex<WorkerStats>>,
}

impl WorkerPoolHandle {
    /// Stop claiming new jobs, let in-flight jobs finish, and join every worker.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for join in self.joins {
            if let Err(e) = join.await {
                error!(error = %e, "worker task ended abnormally");
            }
        }
    }

    pub fn stats(&self) -> WorkerStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn worker_count(&self) -> usize {
        self.joins.len()
    }
}

struct Shared {
    queue: Arc<dyn JobQueue>,
    processor: Arc<dyn JobProcessor>,
    stats: Arc<Mutex<WorkerStats>>,
}

/// Concurrent job workers sharing one queue.
pub struct WorkerPool {
    shared: Arc<Shared>,
}

impl WorkerPool {
    pub fn new(queue: Arc<dyn JobQueue>, processor: Arc<dyn JobProcessor>) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue,
                processor,
                stats: Arc::new(Mutex::new(WorkerStats::default())),
            }),
        }
    }

    /// Spawn `config.workers` worker tasks on the current tokio runtime.
    pub fn spawn(self, config: WorkerPoolConfig) -> WorkerPoolHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let config = Arc::new(config);

        let joins = (0..config.workers.max(1))
            .map(|worker| {
                let shared = self.shared.clone();
                let config = config.clone();
                let shutdown_rx = shutdown_rx.clone();
                tokio::spawn(worker_loop(worker, shared, config, shutdown_rx))
            })
            .collect();

        WorkerPoolHandle {
            shutdown: shutdown_tx,
            joins,
            stats: self.shared.stats.clone(),
        }
    }

    /// Claim and run a single job on the calling task (for testing or
    /// synchronous use). Returns the job in its final state.
    pub async fn process_next(&self, timeout: Option<Duration>) -> Result<Option<Job>, QueueError> {
        match self.shared.queue.claim_next()? {
            Some(job) => self.shared.run(job, timeout).await.map(Some),
            None => Ok(None),
        }
    }
}

impl Shared {
    async fn run(&self, job: Job, timeout: Option<Duration>) -> Result<Job, QueueError> {
        let job_id = job.id;
        self.update_stats(|s| s.current_running += 1);

        let outcome = execute(self.processor.clone(), job, timeout).await;
        let reported = match outcome {
            Ok(result) => {
                debug!(job_id = %job_id, "job completed");
                self.queue.mark_completed(job_id, result)
            }
            Err(error) => {
                warn!(job_id = %job_id, error = %error, "job failed");
                self.queue.mark_failed(job_id, error)
            }
        };

        self.update_stats(|s| {
            s.current_running = s.current_running.saturating_sub(1);
            s.jobs_processed += 1;
            match &reported {
                Ok(job) if job.error.is_none() => s.jobs_succeeded += 1,
                _ => s.jobs_failed += 1,
            }
        });

        reported
    }

    fn update_stats(&self, f: impl FnOnce(&mut WorkerStats)) {
        if let Ok(mut s) = self.stats.lock() {
            f(&mut s);
        }
    }
}

async fn worker_loop(
    worker: usize,
    shared: Arc<Shared>,
    config: Arc<WorkerPoolConfig>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    info!(pool = %config.name, worker, "worker started");
    let signal = shared
        .queue
        .work_signal()
        .unwrap_or_else(|| Arc::new(Notify::new()));

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // Register for wakeups before claiming so a submission landing between
        // an empty claim and the wait below is not missed.
        let notified = signal.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        match shared.queue.claim_next() {
            Ok(Some(job)) => {
                debug!(pool = %config.name, worker, job_id = %job.id, "claimed job");
                if let Err(e) = shared.run(job, config.job_timeout).await {
                    error!(pool = %config.name, worker, error = %e, "failed to record job outcome");
                }
                continue;
            }
            Ok(None) => {}
            Err(e) => {
                error!(pool = %config.name, worker, error = %e, "failed to claim job");
            }
        }

        tokio::select! {
            _ = &mut notified => {}
            _ = tokio::time::sleep(config.poll_interval) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!(pool = %config.name, worker, "worker stopped");
}

/// Run the processor on its own task so a panic stays contained to this job.
async fn execute(
    processor: Arc<dyn JobProcessor>,
    job: Job,
    timeout: Option<Duration>,
) -> Result<serde_json::Value, String> {
    let span = tracing::info_span!("job", job_id = %job.id);
    let task = tokio::spawn(
        async move {
            match timeout {
                Some(limit) => match tokio::time::timeout(limit, processor.process(&job)).await {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(_elapsed) => Err(format!("job timed out after {}ms", limit.as_millis())),
                },
                None => processor.process(&job).await.map_err(|e| e.to_string()),
            }
        }
        .instrument(span),
    );

    match task.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(format!("job panicked: {}", panic_message(e.into_panic()))),
        Err(e) => Err(format!("job aborted: {e}")),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::jobs::queue::InMemoryJobQueue;
    use crate::jobs::types::{JobId, JobState};

    fn pool_with<F, Fut>(f: F) -> (Arc<InMemoryJobQueue>, WorkerPool)
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value, JobError>> + Send + 'static,
    {
        let queue = InMemoryJobQueue::arc();
        let pool = WorkerPool::new(queue.clone(), Arc::new(FnProcessor(f)));
        (queue, pool)
    }

    async fn wait_for_terminal(queue: &InMemoryJobQueue, id: JobId) -> Job {
        for _ in 0..200 {
            let job = queue.get(id).unwrap().unwrap();
            if job.state.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not finish in time");
    }

    #[tokio::test]
    async fn execute_successful_job() {
        let (queue, pool) = pool_with(|job| async move { Ok(json!({ "echo": job.payload })) });

        let id = queue.submit(json!({"name": "a"})).unwrap();
        let done = pool.process_next(None).await.unwrap().unwrap();

        assert_eq!(done.id, id);
        assert_eq!(done.state, JobState::Completed);
        assert_eq!(done.result, Some(json!({"echo": {"name": "a"}})));
        assert!(pool.process_next(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn processor_error_fails_the_job() {
        let (queue, pool) = pool_with(|_job| async { Err(JobError::failed("disk full")) });

        queue.submit(json!({})).unwrap();
        let failed = pool.process_next(None).await.unwrap().unwrap();

        assert_eq!(failed.state, JobState::Failed);
        assert_eq!(failed.error.as_deref(), Some("disk full"));
    }

    #[tokio::test]
    async fn panic_is_contained_to_the_job() {
        let (queue, pool) = pool_with(|job| async move {
            if job.payload["explode"] == json!(true) {
                panic!("kaboom");
            }
            Ok(json!(null))
        });

        let bad = queue.submit(json!({"explode": true})).unwrap();
        let good = queue.submit(json!({"explode": false})).unwrap();

        pool.process_next(None).await.unwrap();
        pool.process_next(None).await.unwrap();

        let bad = queue.get(bad).unwrap().unwrap();
        assert_eq!(bad.state, JobState::Failed);
        assert!(bad.error.unwrap().contains("kaboom"));
        assert_eq!(queue.get(good).unwrap().unwrap().state, JobState::Completed);
    }

    #[tokio::test]
    async fn timeout_fails_the_job() {
        let (queue, pool) = pool_with(|_job| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(json!(null))
        });

        queue.submit(json!({})).unwrap();
        let job = pool
            .process_next(Some(Duration::from_millis(20)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert!(job.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn spawned_pool_drains_queue_and_isolates_failures() {
        let (queue, pool) = pool_with(|job| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if job.payload["fail"] == json!(true) {
                Err(JobError::failed("simulated failure"))
            } else {
                Ok(json!({"ok": true}))
            }
        });

        let handle = pool.spawn(
            WorkerPoolConfig::default()
                .with_workers(3)
                .with_poll_interval(Duration::from_millis(20)),
        );
        assert_eq!(handle.worker_count(), 3);

        let failing = queue.submit(json!({"fail": true})).unwrap();
        let siblings: Vec<_> = (0..5)
            .map(|i| queue.submit(json!({"i": i})).unwrap())
            .collect();

        let failed = wait_for_terminal(&queue, failing).await;
        assert_eq!(failed.state, JobState::Failed);
        assert!(!failed.error.unwrap().is_empty());

        for id in siblings {
            assert_eq!(wait_for_terminal(&queue, id).await.state, JobState::Completed);
        }

        let stats = handle.stats();
        assert_eq!(stats.jobs_processed, 6);
        assert_eq!(stats.jobs_failed, 1);
        assert_eq!(stats.jobs_succeeded, 5);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn idle_worker_wakes_on_submission() {
        let (queue, pool) = pool_with(|_job| async { Ok(json!(null)) });

        // Poll interval far longer than the test: only the submit signal can
        // wake the worker in time.
        let handle = pool.spawn(
            WorkerPoolConfig::default()
                .with_workers(1)
                .with_poll_interval(Duration::from_secs(60)),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;

        let id = queue.submit(json!({})).unwrap();
        assert_eq!(wait_for_terminal(&queue, id).await.state, JobState::Completed);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_lets_in_flight_job_finish() {
        let (queue, pool) = pool_with(|_job| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(json!("done"))
        });

        let handle = pool.spawn(WorkerPoolConfig::default().with_workers(1));
        let id = queue.submit(json!({})).unwrap();

        // Wait until the worker has claimed the job.
        for _ in 0..100 {
            if queue.get(id).unwrap().unwrap().state == JobState::Active {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        handle.shutdown().await;
        assert_eq!(queue.get(id).unwrap().unwrap().state, JobState::Completed);
    }
}
