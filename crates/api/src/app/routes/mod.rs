use axum::{Router, routing::get};

pub mod files;
pub mod queue;
pub mod system;
pub mod users;

/// Router for every endpoint; expects `AppServices` and `Locale` extensions.
pub fn router() -> Router {
    Router::new()
        .route("/", get(system::welcome))
        .route("/health", get(system::health))
        .merge(users::router())
        .nest("/files/queue", queue::router())
        .nest("/files", files::router())
}
