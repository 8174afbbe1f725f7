//! Request DTOs and response JSON helpers.

use serde::Deserialize;
use serde_json::{Value, json};

use filequeue_core::{FileChanges, FileRecord, UserSummary};
use filequeue_infra::jobs::Job;

/// Body of `POST /files` when it creates a record directly.
///
/// All fields are optional at the wire level so that a missing field is
/// reported with the localized "missing fields" message instead of a
/// deserializer error.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest {
    pub user_id: Option<u64>,
    pub name: Option<String>,
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub path: Option<String>,
}

/// Body of `PUT /files/:id`; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileRequest {
    pub name: Option<String>,
    pub size: Option<u64>,
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    pub path: Option<String>,
}

impl From<UpdateFileRequest> for FileChanges {
    fn from(req: UpdateFileRequest) -> Self {
        FileChanges {
            name: req.name,
            size: req.size,
            file_type: req.file_type,
            path: req.path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    pub user_id: Option<u64>,
}

/// `?state=waiting,active`
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    pub state: Option<String>,
}

/// Field carrying the upload payload in a queue submission.
pub const FILE_DATA_FIELD: &str = "fileData";

/// The `fileData` member of a submission body, if it has one.
pub fn file_data(body: &Value) -> Option<&Value> {
    body.as_object()?.get(FILE_DATA_FIELD)
}

pub fn user_to_json(message: String, user: UserSummary) -> Value {
    json!({ "message": message, "user": user })
}

pub fn file_to_json(message: String, file: &FileRecord) -> Value {
    json!({ "message": message, "file": file })
}

pub fn files_to_json(message: String, files: &[FileRecord]) -> Value {
    json!({ "message": message, "files": files })
}

pub fn job_to_json(message: String, job: &Job) -> Value {
    json!({ "message": message, "job": job })
}

pub fn jobs_to_json(message: String, jobs: &[Job]) -> Value {
    json!({ "message": message, "jobs": jobs })
}
