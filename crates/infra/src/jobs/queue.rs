//! Job queue abstraction and the in-memory implementation.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::Notify;

use super::types::{Job, JobId, JobState, TransitionError};

/// Checks a payload before a job is created for it.
pub type PayloadValidator = Box<dyn Fn(&serde_json::Value) -> Result<(), String> + Send + Sync>;

/// Job queue abstraction.
///
/// Producers call [`submit`](JobQueue::submit) and the query methods; the
/// worker pool drives [`claim_next`](JobQueue::claim_next) and the `mark_*`
/// outcomes. Every mutation is applied atomically with respect to readers.
pub trait JobQueue: Send + Sync {
    /// Validate the payload, create a `Waiting` job and return its id.
    fn submit(&self, payload: serde_json::Value) -> Result<JobId, QueueError>;

    /// Atomically take the oldest `Waiting` job and mark it `Active`.
    /// Returns `None` when nothing is waiting.
    fn claim_next(&self) -> Result<Option<Job>, QueueError>;

    /// `Active -> Completed`.
    fn mark_completed(&self, id: JobId, result: serde_json::Value) -> Result<Job, QueueError>;

    /// `Active -> Failed`.
    fn mark_failed(&self, id: JobId, error: String) -> Result<Job, QueueError>;

    /// Snapshot of the jobs whose state is in `states`, oldest first.
    fn list_by_state(&self, states: &[JobState]) -> Result<Vec<Job>, QueueError>;

    /// Point lookup.
    fn get(&self, id: JobId) -> Result<Option<Job>, QueueError>;

    /// Per-state counts.
    fn stats(&self) -> Result<JobStats, QueueError>;

    /// Stop accepting submissions. Already queued jobs stay claimable.
    fn close(&self);

    fn is_accepting(&self) -> bool;

    /// Signal raised on every submission, for queues that can push wakeups.
    /// Workers fall back to polling when this is `None`.
    fn work_signal(&self) -> Option<Arc<Notify>> {
        None
    }
}

/// Job queue error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueueError {
    #[error("invalid job payload: {0}")]
    InvalidPayload(String),
    #[error("queue is not accepting new jobs")]
    Closed,
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job {id}: {source}")]
    InvalidTransition {
        id: JobId,
        #[source]
        source: TransitionError,
    },
    #[error("storage error: {0}")]
    Storage(String),
}

/// Job counts by state.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct JobStats {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobStats {
    pub fn total(&self) -> usize {
        self.waiting + self.active + self.completed + self.failed
    }
}

#[derive(Debug)]
struct QueueState {
    jobs: HashMap<JobId, Job>,
    /// FIFO of `Waiting` job ids.
    waiting: VecDeque<JobId>,
    next_id: u64,
    accepting: bool,
}

/// In-memory job queue. Jobs are retained for the life of the process.
pub struct InMemoryJobQueue {
    state: RwLock<QueueState>,
    signal: Arc<Notify>,
    validator: PayloadValidator,
}

impl InMemoryJobQueue {
    /// Queue accepting any non-null payload.
    pub fn new() -> Self {
        Self::with_validator(|payload| {
            if payload.is_null() {
                Err("payload must not be null".to_string())
            } else {
                Ok(())
            }
        })
    }

    pub fn with_validator<F>(validator: F) -> Self
    where
        F: Fn(&serde_json::Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            state: RwLock::new(QueueState {
                jobs: HashMap::new(),
                waiting: VecDeque::new(),
                next_id: 1,
                accepting: true,
            }),
            signal: Arc::new(Notify::new()),
            validator: Box::new(validator),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, QueueState>, QueueError> {
        self.state
            .read()
            .map_err(|_| QueueError::Storage("queue lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, QueueState>, QueueError> {
        self.state
            .write()
            .map_err(|_| QueueError::Storage("queue lock poisoned".to_string()))
    }

    fn finish<F>(&self, id: JobId, apply: F) -> Result<Job, QueueError>
    where
        F: FnOnce(&mut Job) -> Result<(), TransitionError>,
    {
        let mut state = self.write()?;
        let job = state.jobs.get_mut(&id).ok_or(QueueError::NotFound(id))?;
        apply(job).map_err(|source| QueueError::InvalidTransition { id, source })?;
        Ok(job.clone())
    }
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryJobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryJobQueue")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl JobQueue for InMemoryJobQueue {
    fn submit(&self, payload: serde_json::Value) -> Result<JobId, QueueError> {
        (self.validator)(&payload).map_err(QueueError::InvalidPayload)?;

        let id = {
            let mut state = self.write()?;
            if !state.accepting {
                return Err(QueueError::Closed);
            }
            let id = JobId(state.next_id);
            state.next_id += 1;
            state.jobs.insert(id, Job::new(id, payload));
            state.waiting.push_back(id);
            id
        };

        self.signal.notify_one();
        Ok(id)
    }

    fn claim_next(&self) -> Result<Option<Job>, QueueError> {
        let mut state = self.write()?;

        while let Some(id) = state.waiting.pop_front() {
            let Some(job) = state.jobs.get_mut(&id) else {
                continue;
            };
            // Only `Waiting` ids are ever pushed, so this succeeds unless the
            // job was already moved on.
            if job.mark_active().is_ok() {
                return Ok(Some(job.clone()));
            }
        }

        Ok(None)
    }

    fn mark_completed(&self, id: JobId, result: serde_json::Value) -> Result<Job, QueueError> {
        self.finish(id, |job| job.mark_completed(result))
    }

    fn mark_failed(&self, id: JobId, error: String) -> Result<Job, QueueError> {
        self.finish(id, |job| job.mark_failed(error))
    }

    fn list_by_state(&self, states: &[JobState]) -> Result<Vec<Job>, QueueError> {
        let state = self.read()?;
        let mut result: Vec<_> = state
            .jobs
            .values()
            .filter(|j| states.contains(&j.state))
            .cloned()
            .collect();

        result.sort_by_key(|j| j.id);
        Ok(result)
    }

    fn get(&self, id: JobId) -> Result<Option<Job>, QueueError> {
        Ok(self.read()?.jobs.get(&id).cloned())
    }

    fn stats(&self) -> Result<JobStats, QueueError> {
        let state = self.read()?;
        let mut stats = JobStats::default();

        for job in state.jobs.values() {
            match job.state {
                JobState::Waiting => stats.waiting += 1,
                JobState::Active => stats.active += 1,
                JobState::Completed => stats.completed += 1,
                JobState::Failed => stats.failed += 1,
            }
        }

        Ok(stats)
    }

    fn close(&self) {
        if let Ok(mut state) = self.state.write() {
            state.accepting = false;
        }
    }

    fn is_accepting(&self) -> bool {
        self.state.read().map(|s| s.accepting).unwrap_or(false)
    }

    fn work_signal(&self) -> Option<Arc<Notify>> {
        Some(self.signal.clone())
    }
}

impl<Q> JobQueue for Arc<Q>
where
    Q: JobQueue + ?Sized,
{
    fn submit(&self, payload: serde_json::Value) -> Result<JobId, QueueError> {
        (**self).submit(payload)
    }

    fn claim_next(&self) -> Result<Option<Job>, QueueError> {
        (**self).claim_next()
    }

    fn mark_completed(&self, id: JobId, result: serde_json::Value) -> Result<Job, QueueError> {
        (**self).mark_completed(id, result)
    }

    fn mark_failed(&self, id: JobId, error: String) -> Result<Job, QueueError> {
        (**self).mark_failed(id, error)
    }

    fn list_by_state(&self, states: &[JobState]) -> Result<Vec<Job>, QueueError> {
        (**self).list_by_state(states)
    }

    fn get(&self, id: JobId) -> Result<Option<Job>, QueueError> {
        (**self).get(id)
    }

    fn stats(&self) -> Result<JobStats, QueueError> {
        (**self).stats()
    }

    fn close(&self) {
        (**self).close()
    }

    fn is_accepting(&self) -> bool {
        (**self).is_accepting()
    }

    fn work_signal(&self) -> Option<Arc<Notify>> {
        (**self).work_signal()
    }
}
