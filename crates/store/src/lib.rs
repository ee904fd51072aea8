//! Bundle persistence for betadrop.
//!
//! [`Repository`] is the only owner of mutable shared state: one SQLite
//! database holding every bundle record. Version and build groupings are
//! computed at query time from an indexed scan; nothing else is cached.
//! [`DownloadRecorder`] applies download-count increments off the request
//! path.

mod recorder;
mod repository;
mod schema;

use betadrop_protocol::ErrorClass;

pub use recorder::{DEFAULT_QUEUE_CAPACITY, DownloadRecorder};
pub use repository::Repository;
pub use schema::SCHEMA_VERSION;

/// Errors produced by the store crate.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bundle not found: {0}")]
    NotFound(String),

    #[error("duplicate bundle id: {0}")]
    DuplicateId(String),

    #[error("download recorder stopped")]
    RecorderStopped,
}

impl StoreError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound(_) => ErrorClass::NotFound,
            Self::DuplicateId(_) => ErrorClass::InvariantViolation,
            Self::Sqlite(_) | Self::Io(_) | Self::RecorderStopped => ErrorClass::Storage,
        }
    }
}
