use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::app::services::AppServices;
use crate::i18n::Locale;

/// `GET /`: localized plain-text greeting.
pub async fn welcome(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(locale): Extension<Locale>,
) -> String {
    services.t("welcomeMessage", &locale)
}

pub async fn health(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.queue.stats() {
        Ok(jobs) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "accepting": services.queue.is_accepting(),
                "jobs": jobs,
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "health check could not read queue stats");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable", "error": e.to_string() })),
            )
                .into_response()
        }
    }
}
