//! Infrastructure layer: record storage, the upload job queue, and its workers.

pub mod jobs;
pub mod records;
