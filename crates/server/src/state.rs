use std::sync::Arc;

use betadrop_artifacts::ArtifactStore;
use betadrop_ingest::IngestOrchestrator;
use betadrop_ota::DistributionEncoder;
use betadrop_store::{DownloadRecorder, Repository};

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub encoder: Arc<DistributionEncoder>,
    pub artifacts: ArtifactStore,
    pub ingest: Arc<IngestOrchestrator>,
    pub recorder: DownloadRecorder,
}
