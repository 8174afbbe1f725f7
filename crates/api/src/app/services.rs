//! Service wiring: record store, credential hashing, job queue and workers.

use std::sync::Arc;

use anyhow::Context;
use axum::response::Response;

use filequeue_auth::{BcryptCredentials, CredentialService};
use filequeue_infra::{
    jobs::{
        FileProcessor, InMemoryJobQueue, JobQueue, WorkerPool, WorkerPoolHandle,
        validate_file_payload,
    },
    records::{InMemoryRecordStore, RecordStore},
};

use crate::app::errors::ApiError;
use crate::config::Config;
use crate::i18n::{Locale, Localizer};

/// Shared state handed to every handler.
pub struct AppServices {
    pub records: Arc<dyn RecordStore>,
    pub credentials: Arc<dyn CredentialService>,
    pub queue: Arc<dyn JobQueue>,
    pub localizer: Arc<Localizer>,
}

impl AppServices {
    pub fn t(&self, key: &str, locale: &Locale) -> String {
        self.localizer.lookup(key, locale)
    }

    pub fn error_response(&self, locale: &Locale, err: ApiError) -> Response {
        err.into_localized_response(&self.localizer, locale)
    }
}

pub async fn build_services(config: &Config) -> anyhow::Result<AppServices> {
    let mut localizer = Localizer::embedded(&config.default_locale)
        .context("failed to load embedded locale bundles")?;
    if let Some(dir) = &config.locales_dir {
        localizer = localizer
            .merge_dir(dir)
            .with_context(|| format!("failed to load locales from {}", dir.display()))?;
    }
    tracing::info!(locales = ?localizer.locales(), default = %config.default_locale, "localizer ready");

    let credentials =
        BcryptCredentials::new(config.bcrypt_cost).context("invalid BCRYPT_COST")?;

    Ok(AppServices {
        records: build_record_store(config).await?,
        credentials: Arc::new(credentials),
        queue: Arc::new(InMemoryJobQueue::with_validator(validate_file_payload)),
        localizer: Arc::new(localizer),
    })
}

#[cfg(feature = "sqlite")]
async fn build_record_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    use filequeue_infra::records::SqliteRecordStore;

    match &config.database_url {
        Some(url) => {
            let store = SqliteRecordStore::connect(url)
                .await
                .with_context(|| format!("failed to open record store at {url}"))?;
            tracing::info!("using sqlite record store");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryRecordStore::new())),
    }
}

#[cfg(not(feature = "sqlite"))]
async fn build_record_store(config: &Config) -> anyhow::Result<Arc<dyn RecordStore>> {
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but sqlite support is not compiled in; using in-memory records");
    }
    Ok(Arc::new(InMemoryRecordStore::new()))
}

/// Start the upload workers against the shared queue.
pub fn spawn_workers(services: &AppServices, config: &Config) -> WorkerPoolHandle {
    let mut processor = FileProcessor::new(config.processing_delay);
    if let Some(max) = config.max_upload_bytes {
        processor = processor.with_max_size(max);
    }

    WorkerPool::new(services.queue.clone(), Arc::new(processor)).spawn(config.worker_pool())
}
