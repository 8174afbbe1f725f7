//! File metadata records.
//!
//! A `FileRecord` references its owner by [`UserId`] only; it does not own the
//! user and nothing cascades between the two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::{FileId, UserId};

/// Stored file metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    pub user_id: UserId,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub file_type: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for FileRecord {
    type Id = FileId;

    fn id(&self) -> FileId {
        self.id
    }
}

/// Input for creating a file record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub user_id: UserId,
    pub name: String,
    pub size: u64,
    pub file_type: String,
    pub path: String,
}

impl NewFile {
    pub fn new(
        user_id: UserId,
        name: impl Into<String>,
        size: u64,
        file_type: impl Into<String>,
        path: impl Into<String>,
    ) -> DomainResult<Self> {
        let new = Self {
            user_id,
            name: name.into(),
            size,
            file_type: file_type.into(),
            path: path.into(),
        };
        require_non_empty("name", &new.name)?;
        require_non_empty("type", &new.file_type)?;
        require_non_empty("path", &new.path)?;
        Ok(new)
    }

    pub fn into_record(self, id: FileId, now: DateTime<Utc>) -> FileRecord {
        FileRecord {
            id,
            user_id: self.user_id,
            name: self.name,
            size: self.size,
            file_type: self.file_type,
            path: self.path,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a file record; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileChanges {
    pub name: Option<String>,
    pub size: Option<u64>,
    pub file_type: Option<String>,
    pub path: Option<String>,
}

impl FileChanges {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(file_type) = &self.file_type {
            require_non_empty("type", file_type)?;
        }
        if let Some(path) = &self.path {
            require_non_empty("path", path)?;
        }
        Ok(())
    }

    /// Apply the changes in place, bumping `updated_at`.
    pub fn apply(self, record: &mut FileRecord, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            record.name = name;
        }
        if let Some(size) = self.size {
            record.size = size;
        }
        if let Some(file_type) = self.file_type {
            record.file_type = file_type;
        }
        if let Some(path) = self.path {
            record.path = path;
        }
        record.updated_at = now;
    }
}

/// Find-by-filter criteria for file listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileFilter {
    pub user_id: Option<UserId>,
}

impl FileFilter {
    pub fn owned_by(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn matches(&self, record: &FileRecord) -> bool {
        self.user_id.is_none_or(|u| record.user_id == u)
    }
}

fn require_non_empty(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}
