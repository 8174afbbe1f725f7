//! API error taxonomy and its localized JSON rendering.
//!
//! Every failure a handler can produce is one of these variants. Handlers never
//! return raw collaborator errors; they wrap them with the message key the
//! client should see.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use filequeue_core::DomainError;
use filequeue_infra::{jobs::QueueError, records::StoreError};

use crate::i18n::{Locale, Localizer};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed input.
    #[error("validation failed ({key})")]
    Validation {
        key: &'static str,
        detail: Option<String>,
    },

    #[error("not found ({key})")]
    NotFound { key: &'static str },

    /// Duplicate user; reported as a bad request.
    #[error("conflict ({key})")]
    Conflict { key: &'static str },

    #[error("store failure ({key}): {detail}")]
    Store { key: &'static str, detail: String },

    #[error("queue failure ({key}): {detail}")]
    Queue { key: &'static str, detail: String },
}

impl ApiError {
    pub fn validation(key: &'static str) -> Self {
        Self::Validation { key, detail: None }
    }

    pub fn invalid(key: &'static str, detail: impl ToString) -> Self {
        Self::Validation {
            key,
            detail: Some(detail.to_string()),
        }
    }

    pub fn not_found(key: &'static str) -> Self {
        Self::NotFound { key }
    }

    pub fn conflict(key: &'static str) -> Self {
        Self::Conflict { key }
    }

    pub fn store(key: &'static str, err: impl ToString) -> Self {
        Self::Store {
            key,
            detail: err.to_string(),
        }
    }

    pub fn queue(key: &'static str, err: impl ToString) -> Self {
        Self::Queue {
            key,
            detail: err.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } | Self::Conflict { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Store { .. } | Self::Queue { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Self::Validation { key, .. }
            | Self::NotFound { key }
            | Self::Conflict { key }
            | Self::Store { key, .. }
            | Self::Queue { key, .. } => *key,
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            Self::Validation { detail, .. } => detail.as_deref(),
            Self::Store { detail, .. } | Self::Queue { detail, .. } => Some(detail.as_str()),
            Self::NotFound { .. } | Self::Conflict { .. } => None,
        }
    }

    /// `{ "message": <localized>, "error": <detail> }`; `error` only when there
    /// is a diagnostic detail to report.
    pub fn into_localized_response(self, localizer: &Localizer, locale: &Locale) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(key = self.key(), error = %self, "request failed");
        } else {
            tracing::debug!(key = self.key(), error = %self, "request rejected");
        }

        let message = localizer.lookup(self.key(), locale);
        let body = match self.detail() {
            Some(detail) => json!({ "message": message, "error": detail }),
            None => json!({ "message": message }),
        };
        (status, Json(body)).into_response()
    }

    /// Map a domain rule violation to a 400 under `key`.
    pub fn from_domain(key: &'static str, err: DomainError) -> Self {
        Self::invalid(key, err)
    }

    /// Map a store failure: duplicates become conflicts under `duplicate_key`,
    /// everything else a 500 under `key`.
    pub fn from_store(key: &'static str, duplicate_key: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => Self::conflict(duplicate_key),
            other => Self::store(key, other),
        }
    }

    /// Map a queue failure: payload rejection is the client's fault.
    pub fn from_queue(key: &'static str, err: QueueError) -> Self {
        match err {
            QueueError::InvalidPayload(reason) => Self::invalid("invalidFileData", reason),
            other => Self::queue(key, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_taxonomy() {
        assert_eq!(ApiError::validation("k").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("k").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::not_found("k").status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::store("k", "boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApiError::queue("k", "boom").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn duplicate_store_errors_become_conflicts() {
        let err = ApiError::from_store(
            "errorRegisteringUser",
            "userAlreadyExists",
            StoreError::Duplicate("email".into()),
        );
        assert!(matches!(err, ApiError::Conflict { key: "userAlreadyExists" }));

        let err = ApiError::from_store(
            "errorRegisteringUser",
            "userAlreadyExists",
            StoreError::Backend("disk full".into()),
        );
        assert_eq!(err.key(), "errorRegisteringUser");
        assert_eq!(err.detail(), Some("storage backend error: disk full"));
    }

    #[test]
    fn rejected_payloads_are_client_errors() {
        let err = ApiError::from_queue(
            "errorQueueingFile",
            QueueError::InvalidPayload("name is required".into()),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.key(), "invalidFileData");

        let err = ApiError::from_queue("errorQueueingFile", QueueError::Closed);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn domain_violations_are_bad_requests_with_detail() {
        let err = ApiError::from_domain(
            "missingRequiredFields",
            DomainError::validation("name must not be empty"),
        );
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.key(), "missingRequiredFields");
        assert_eq!(err.detail(), Some("validation failed: name must not be empty"));
    }
}
