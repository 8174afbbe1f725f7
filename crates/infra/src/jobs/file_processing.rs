//! The file-upload processing routine run by the worker pool.
//!
//! Processing is simulated: the routine validates the metadata, waits for the
//! configured delay and reports what it processed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use super::types::Job;
use super::worker::{JobError, JobProcessor};

/// Raw file metadata carried by an upload job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl FileData {
    /// Parse and check the minimum fields of an upload payload.
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self, String> {
        if !payload.is_object() {
            return Err("file data must be a JSON object".to_string());
        }
        let data: FileData = serde_json::from_value(payload.clone()).map_err(|e| e.to_string())?;
        if data.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }
        Ok(data)
    }
}

/// Queue-side validator for upload payloads.
pub fn validate_file_payload(payload: &serde_json::Value) -> Result<(), String> {
    FileData::from_payload(payload).map(|_| ())
}

/// Simulated upload processing.
#[derive(Debug, Clone)]
pub struct FileProcessor {
    delay: Duration,
    max_size: Option<u64>,
}

impl FileProcessor {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_size: None,
        }
    }

    /// Fail files whose declared size exceeds `max_size` bytes.
    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

impl Default for FileProcessor {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl JobProcessor for FileProcessor {
    async fn process(&self, job: &Job) -> Result<serde_json::Value, JobError> {
        let data = FileData::from_payload(&job.payload).map_err(JobError::InvalidPayload)?;

        if let (Some(max), Some(size)) = (self.max_size, data.size) {
            if size > max {
                return Err(JobError::failed(format!(
                    "file exceeds maximum size ({size} > {max} bytes)"
                )));
            }
        }

        info!(job_id = %job.id, file = %data.name, "processing file");
        tokio::time::sleep(self.delay).await;
        info!(job_id = %job.id, file = %data.name, "file processed");

        Ok(json!({
            "name": data.name,
            "size": data.size,
            "processedAt": Utc::now(),
        }))
    }
}
