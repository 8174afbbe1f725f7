//! Record store: durable storage for users and file metadata.
//!
//! Callers only see the CRUD-style [`RecordStore`] trait; the in-memory store
//! is the default and a sqlite store is available behind the `sqlite` feature.

use async_trait::async_trait;

use filequeue_core::{FileChanges, FileFilter, FileId, FileRecord, NewFile, NewUser, User};

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryRecordStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteRecordStore;

/// CRUD access to users and file records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create a user. Fails with [`StoreError::Duplicate`] if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn create_file(&self, file: NewFile) -> Result<FileRecord, StoreError>;

    /// Files matching `filter`, ordered by id.
    async fn list_files(&self, filter: FileFilter) -> Result<Vec<FileRecord>, StoreError>;

    async fn find_file(&self, id: FileId) -> Result<Option<FileRecord>, StoreError>;

    /// Apply `changes`; `None` when the file does not exist.
    async fn update_file(
        &self,
        id: FileId,
        changes: FileChanges,
    ) -> Result<Option<FileRecord>, StoreError>;

    /// `false` when the file did not exist.
    async fn delete_file(&self, id: FileId) -> Result<bool, StoreError>;
}

/// Record store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("duplicate record: {0}")]
    Duplicate(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}
