//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: record store, credentials, job queue and worker startup
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: error taxonomy and localized error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use filequeue_infra::jobs::{JobQueue, WorkerPoolHandle};

use crate::config::Config;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// A ready-to-serve application: the router plus the background workers
/// draining its queue.
pub struct App {
    pub router: Router,
    pub services: Arc<services::AppServices>,
    pub workers: WorkerPoolHandle,
}

impl App {
    /// Stop taking uploads, then let the workers finish what they hold.
    pub async fn shutdown(self) {
        self.services.queue.close();
        match self.services.queue.stats() {
            Ok(stats) => tracing::info!(waiting = stats.waiting, active = stats.active, "shutting down workers"),
            Err(e) => tracing::warn!(error = %e, "shutting down workers; queue stats unavailable"),
        }
        self.workers.shutdown().await;
        tracing::info!("workers stopped");
    }
}

/// Build the full application (public entrypoint used by `main.rs`).
///
/// Spawns the worker pool, so it must run inside a Tokio runtime.
pub async fn build_app(config: &Config) -> anyhow::Result<App> {
    let services = Arc::new(services::build_services(config).await?);
    let workers = services::spawn_workers(&services, config);
    tracing::info!(workers = workers.worker_count(), "upload workers started");

    let router = routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::from_fn(middleware::request_id_middleware))
            .layer(axum::middleware::from_fn_with_state(
                services.localizer.clone(),
                middleware::locale_middleware,
            ))
            .layer(Extension(services.clone())),
    );

    Ok(App {
        router,
        services,
        workers,
    })
}
