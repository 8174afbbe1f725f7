//! Core job types and the job state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique job identifier, issued by the queue in strictly increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Job lifecycle state.
///
/// Transitions only move forward: `Waiting -> Active -> {Completed, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Queued, waiting to be claimed
    Waiting,
    /// Claimed by a worker and executing
    Active,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl JobState {
    pub const ALL: [JobState; 4] = [
        JobState::Waiting,
        JobState::Active,
        JobState::Completed,
        JobState::Failed,
    ];

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Active => "active",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "waiting" => Ok(JobState::Waiting),
            "active" => Ok(JobState::Active),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            other => Err(format!("unknown job state {other:?}")),
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected state change; carries where the job actually was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot move job from {from} to {to}")]
pub struct TransitionError {
    pub from: JobState,
    pub to: JobState,
}

/// A unit of asynchronous work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    /// Opaque producer data
    pub payload: serde_json::Value,
    pub state: JobState,
    /// Set only once `Completed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Set only once `Failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: JobId, payload: serde_json::Value) -> Self {
        Self {
            id,
            payload,
            state: JobState::Waiting,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// `Waiting -> Active`.
    pub fn mark_active(&mut self) -> Result<(), TransitionError> {
        self.transition(JobState::Waiting, JobState::Active)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// `Active -> Completed`.
    pub fn mark_completed(&mut self, result: serde_json::Value) -> Result<(), TransitionError> {
        self.transition(JobState::Active, JobState::Completed)?;
        self.result = Some(result);
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// `Active -> Failed`.
    pub fn mark_failed(&mut self, error: impl Into<String>) -> Result<(), TransitionError> {
        self.transition(JobState::Active, JobState::Failed)?;
        let error = error.into();
        self.error = Some(if error.trim().is_empty() {
            "job failed without a description".to_string()
        } else {
            error
        });
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    fn transition(&mut self, from: JobState, to: JobState) -> Result<(), TransitionError> {
        if self.state != from {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> Job {
        Job::new(JobId(1), serde_json::json!({"name": "a.txt"}))
    }

    #[test]
    fn job_lifecycle() {
        let mut job = job();
        assert_eq!(job.state, JobState::Waiting);
        assert!(job.started_at.is_none());

        job.mark_active().unwrap();
        assert_eq!(job.state, JobState::Active);
        assert!(job.started_at.is_some());

        job.mark_completed(serde_json::json!({"ok": true})).unwrap();
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.result, Some(serde_json::json!({"ok": true})));
        assert!(job.error.is_none());
        assert!(job.finished_at >= job.started_at);
    }

    #[test]
    fn failure_records_error() {
        let mut job = job();
        job.mark_active().unwrap();
        job.mark_failed("disk full").unwrap();

        assert_eq!(job.state, JobState::Failed);
        assert_eq!(job.error.as_deref(), Some("disk full"));
        assert!(job.result.is_none());
    }

    #[test]
    fn blank_failure_still_has_a_description() {
        let mut job = job();
        job.mark_active().unwrap();
        job.mark_failed("").unwrap();
        assert!(!job.error.unwrap().is_empty());
    }

    #[test]
    fn terminal_states_are_final() {
        let mut job = job();
        job.mark_active().unwrap();
        job.mark_completed(serde_json::Value::Null).unwrap();

        assert_eq!(
            job.mark_failed("late").unwrap_err(),
            TransitionError {
                from: JobState::Completed,
                to: JobState::Failed
            }
        );
        assert!(job.mark_active().is_err());
        assert!(job.mark_completed(serde_json::Value::Null).is_err());
        assert_eq!(job.state, JobState::Completed);
    }

    #[test]
    fn cannot_finish_a_waiting_job() {
        let mut job = job();
        assert!(job.mark_completed(serde_json::Value::Null).is_err());
        assert!(job.mark_failed("x").is_err());
        assert_eq!(job.state, JobState::Waiting);
    }

    #[test]
    fn parses_state_names() {
        assert_eq!("Waiting".parse::<JobState>().unwrap(), JobState::Waiting);
        assert_eq!(" failed ".parse::<JobState>().unwrap(), JobState::Failed);
        assert!("delayed".parse::<JobState>().is_err());
    }

    #[test]
    fn serializes_state_in_lowercase() {
        let json = serde_json::to_value(job()).unwrap();
        assert_eq!(json["state"], "waiting");
        assert_eq!(json["id"], 1);
        assert!(json.get("result").is_none());
        assert!(json.get("createdAt").is_some());
    }
}
