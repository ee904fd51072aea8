//! Linear ingestion pipeline.

use std::path::Path;
use std::sync::Arc;

use betadrop_artifacts::{ArtifactError, ArtifactStore};
use betadrop_ota::DistributionEncoder;
use betadrop_protocol::{ArtifactKey, ArtifactKind, BundlePayload, BundleRecord, Platform};
use betadrop_store::Repository;
use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::error::{IdError, IngestError};
use crate::id;
use crate::parser::PackageParser;

/// One uploaded file as delivered by the HTTP layer.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Client-side file name; only its extension is used.
    pub file_name: String,
    pub data: Bytes,
    pub changelog: Option<String>,
}

/// Turns uploads into committed bundle records.
pub struct IngestOrchestrator {
    repo: Arc<Repository>,
    artifacts: ArtifactStore,
    encoder: Arc<DistributionEncoder>,
    parser: Arc<dyn PackageParser>,
    generate_id: fn() -> Result<String, IdError>,
}

impl IngestOrchestrator {
    pub fn new(
        repo: Arc<Repository>,
        artifacts: ArtifactStore,
        encoder: Arc<DistributionEncoder>,
        parser: Arc<dyn PackageParser>,
    ) -> Self {
        Self {
            repo,
            artifacts,
            encoder,
            parser,
            generate_id: id::generate,
        }
    }

    #[cfg(test)]
    fn with_id_source(mut self, generate_id: fn() -> Result<String, IdError>) -> Self {
        self.generate_id = generate_id;
        self
    }

    /// Runs the whole pipeline for one upload. Blocking.
    pub fn ingest(&self, upload: Upload) -> Result<BundlePayload, IngestError> {
        let record = self.ingest_record(upload)?;
        Ok(self.encoder.payload(&record))
    }

    /// Same as [`ingest`](Self::ingest), returning the committed record.
    pub fn ingest_record(&self, upload: Upload) -> Result<BundleRecord, IngestError> {
        // Validate.
        let platform = platform_for(&upload.file_name)?;
        if upload.data.is_empty() {
            return Err(IngestError::EmptyUpload);
        }

        // Identify.
        let id = (self.generate_id)()?;
        debug!(%id, %platform, size = upload.data.len(), "ingesting upload");

        // Stage.
        let package_key = ArtifactKey {
            id: id.clone(),
            kind: ArtifactKind::Package(platform),
        };
        let staged = self
            .artifacts
            .write_package(&package_key, &upload.data)
            .map_err(|e| match e {
                ArtifactError::AlreadyExists(_) => {
                    error!(%id, "generated id collides with a staged package");
                    IngestError::DuplicateId(id.clone())
                }
                other => IngestError::StorageWriteFailed(other),
            })?;
        debug!(%id, sha256 = %staged.sha256, "package staged");

        // Parse. The staged file is kept on failure.
        let meta = self.parser.parse(&staged.path).map_err(|e| {
            warn!(%id, error = %e, "package parse failed, staged file left in place");
            IngestError::PackageParseFailed(e)
        })?;
        debug!(%id, bundle_id = %meta.bundle_id, version = %meta.version, "package parsed");

        // Persist icon.
        self.artifacts
            .write_icon(&id, &meta.icon)
            .map_err(|e| match e {
                ArtifactError::AlreadyExists(_) => {
                    error!(%id, "generated id collides with a stored icon");
                    IngestError::DuplicateId(id.clone())
                }
                other => IngestError::IconWriteFailed(other),
            })?;

        // Commit.
        let record = BundleRecord {
            id,
            platform,
            name: meta.name,
            bundle_id: meta.bundle_id,
            version: meta.version,
            build: meta.build,
            size_bytes: meta.size_bytes,
            changelog: upload.changelog.unwrap_or_default(),
            downloads: 0,
            created_at: Utc::now(),
        };
        self.repo.create(&record)?;

        info!(
            id = %record.id,
            platform = %record.platform,
            bundle_id = %record.bundle_id,
            version = %record.version,
            build = %record.build,
            "bundle ingested"
        );
        Ok(record)
    }
}

fn platform_for(file_name: &str) -> Result<Platform, IngestError> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(Platform::from_extension)
        .ok_or_else(|| IngestError::UnsupportedFileType(file_name.to_string()))
}
