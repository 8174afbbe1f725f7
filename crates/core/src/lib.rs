//! `filequeue-core`: domain building blocks shared by every other crate.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the `User` and `FileRecord` entities, and their input shapes.

pub mod entity;
pub mod error;
pub mod file;
pub mod id;
pub mod user;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use file::{FileChanges, FileFilter, FileRecord, NewFile};
pub use id::{FileId, UserId};
pub use user::{NewUser, User, UserSummary};
