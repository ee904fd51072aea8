//! Ingestion error types.

use betadrop_artifacts::ArtifactError;
use betadrop_protocol::ErrorClass;
use betadrop_store::StoreError;

use crate::parser::ParseError;

/// Failure of the identifier generator.
#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error("id generation failed: {0}")]
    GenerationFailed(String),
}

/// Errors produced by the ingestion pipeline, one per step.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("empty upload")]
    EmptyUpload,

    #[error(transparent)]
    GenerationFailed(#[from] IdError),

    #[error("storage write failed: {0}")]
    StorageWriteFailed(#[source] ArtifactError),

    #[error("package parse failed: {0}")]
    PackageParseFailed(#[from] ParseError),

    #[error("icon write failed: {0}")]
    IconWriteFailed(#[source] ArtifactError),

    #[error("duplicate bundle id: {0}")]
    DuplicateId(String),

    #[error("store error: {0}")]
    Store(#[source] StoreError),
}

impl IngestError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::UnsupportedFileType(_) | Self::EmptyUpload => ErrorClass::Validation,
            Self::GenerationFailed(_) | Self::StorageWriteFailed(_) | Self::IconWriteFailed(_) => {
                ErrorClass::Storage
            }
            Self::PackageParseFailed(e) => e.class(),
            Self::DuplicateId(_) => ErrorClass::InvariantViolation,
            Self::Store(e) => e.class(),
        }
    }
}

impl From<StoreError> for IngestError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateId(id) => Self::DuplicateId(id),
            other => Self::Store(other),
        }
    }
}
