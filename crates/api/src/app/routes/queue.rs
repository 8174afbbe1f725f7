//! Upload job submission and status endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};

use filequeue_infra::jobs::{JobId, JobState};

use crate::app::{dto, errors::ApiError, services::AppServices};
use crate::i18n::Locale;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_jobs).post(submit))
        .route("/:job_id", get(get_job))
}

/// Submit `payload` and answer 202 with the job id.
pub fn enqueue(services: &AppServices, locale: &Locale, payload: Value) -> Response {
    match services.queue.submit(payload) {
        Ok(job_id) => {
            tracing::info!(%job_id, "upload job queued");
            let message = services.t("fileQueued", locale);
            (
                StatusCode::ACCEPTED,
                Json(json!({ "message": message, "jobId": job_id })),
            )
                .into_response()
        }
        Err(e) => services.error_response(locale, ApiError::from_queue("errorQueueingFile", e)),
    }
}

/// `POST /files/queue`: accepts `{ "fileData": {...} }` or the file data itself.
pub async fn submit(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(body)) => {
            let payload = match dto::file_data(&body) {
                Some(file_data) => file_data.clone(),
                None => body,
            };
            enqueue(&services, &locale, payload)
        }
        Err(rejection) => services.error_response(
            &locale,
            ApiError::invalid("invalidFileData", rejection.body_text()),
        ),
    }
}

/// `GET /files/queue[?state=waiting,active]`
pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
    query: Result<Query<dto::ListJobsQuery>, QueryRejection>,
) -> Response {
    let result = query
        .map_err(|r| ApiError::invalid("invalidQuery", r.body_text()))
        .and_then(|Query(q)| parse_states(q.state.as_deref()))
        .and_then(|states| {
            services
                .queue
                .list_by_state(&states)
                .map_err(|e| ApiError::queue("errorFetchingJobs", e))
        });

    match result {
        Ok(jobs) => {
            let message = services.t("jobsFetched", &locale);
            (StatusCode::OK, Json(dto::jobs_to_json(message, &jobs))).into_response()
        }
        Err(err) => services.error_response(&locale, err),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
    Path(job_id): Path<String>,
) -> Response {
    let result = job_id
        .parse::<JobId>()
        .map_err(|_| ApiError::not_found("jobNotFound"))
        .and_then(|id| {
            services
                .queue
                .get(id)
                .map_err(|e| ApiError::queue("errorFetchingJobs", e))?
                .ok_or_else(|| ApiError::not_found("jobNotFound"))
        });

    match result {
        Ok(job) => {
            let message = services.t("jobFetched", &locale);
            (StatusCode::OK, Json(dto::job_to_json(message, &job))).into_response()
        }
        Err(err) => services.error_response(&locale, err),
    }
}

/// Comma-separated state names; absent or empty means every state.
fn parse_states(raw: Option<&str>) -> Result<Vec<JobState>, ApiError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(JobState::ALL.to_vec());
    };

    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<JobState>().map_err(|e| ApiError::invalid("invalidQuery", e)))
        .collect()
}
