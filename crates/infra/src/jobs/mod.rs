//! Background upload queue: jobs, the queue, and the worker pool.
//!
//! ## Design
//!
//! - Producers `submit` a payload and get a job id back immediately
//! - Workers `claim_next` under the queue lock, so each job runs exactly once
//! - State only moves forward: waiting → active → completed | failed
//! - Failed jobs stay failed; there are no automatic retries
//! - Jobs are kept for status queries until the process exits
//!
//! ## Components
//!
//! - `Job`: payload plus lifecycle state and timestamps
//! - `JobQueue`: submission, claiming, outcomes, queries (in-memory impl)
//! - `WorkerPool`: concurrent claim → execute → report loops
//! - `FileProcessor`: the simulated upload routine

pub mod file_processing;
pub mod queue;
pub mod types;
pub mod worker;

pub use file_processing::{validate_file_payload, FileData, FileProcessor};
pub use queue::{InMemoryJobQueue, JobQueue, JobStats, PayloadValidator, QueueError};
pub use types::{Job, JobId, JobState, TransitionError};
pub use worker::{
    FnProcessor, JobError, JobProcessor, WorkerPool, WorkerPoolConfig, WorkerPoolHandle, WorkerStats,
};
