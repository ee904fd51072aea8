//! Package and icon files stored under a data directory.
//!
//! Layout: `<root>/app/<id>.<ipa|apk>` and `<root>/icon/<id>.png`. Files are
//! written once, fsynced, and never modified or deleted afterwards.

mod store;
mod validation;

use betadrop_protocol::ErrorClass;

pub use store::{ArtifactStore, StoredFile, checksum_bytes};
pub use validation::{parse_file_name, validate_file_name};

/// Errors produced by the artifacts crate.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("artifact already exists: {0}")]
    AlreadyExists(String),

    #[error("artifact not found: {0}")]
    NotFound(String),

    #[error("invalid file name: {0}")]
    InvalidName(String),
}

impl ArtifactError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound(_) | Self::InvalidName(_) => ErrorClass::NotFound,
            Self::AlreadyExists(_) => ErrorClass::InvariantViolation,
            Self::Image(_) => ErrorClass::Encoding,
            Self::Io(_) => ErrorClass::Storage,
        }
    }
}
