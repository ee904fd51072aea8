//! Application wiring: builds every component from the configuration and
//! runs the HTTP server until shutdown.

use std::sync::Arc;
use std::time::Duration;

use betadrop_artifacts::ArtifactStore;
use betadrop_ingest::{CommandParser, IngestOrchestrator, PackageParser, UnconfiguredParser};
use betadrop_ota::{DistributionEncoder, PublicOrigin};
use betadrop_server::{AppState, HttpServer, ServerConfig};
use betadrop_store::{DownloadRecorder, Repository};

use crate::config::Config;

/// How long in-flight requests and queued download counts get to finish.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the server until shutdown is requested.
pub async fn run(config: Config) -> anyhow::Result<()> {
    // -- Storage --
    let data_dir = config.data_path();
    let repo = Arc::new(Repository::open(&config.database_path())?);
    let artifacts = ArtifactStore::open(&data_dir)?;
    tracing::info!(
        data_dir = %data_dir.display(),
        bundles = repo.count()?,
        "storage opened"
    );

    // -- Distribution --
    let tls = config.tls()?;
    let origin = PublicOrigin::resolve(config.public_url.as_deref(), tls.is_some(), config.port)?;
    if !origin.is_https() {
        tracing::warn!(%origin, "public origin is not HTTPS; iOS devices will refuse OTA installs");
    }
    let encoder = Arc::new(DistributionEncoder::new(origin));

    // -- Ingestion --
    let parser = build_parser(&config);
    let ingest = Arc::new(IngestOrchestrator::new(
        Arc::clone(&repo),
        artifacts.clone(),
        Arc::clone(&encoder),
        parser,
    ));

    // -- Download counter --
    let (recorder, recorder_worker) =
        DownloadRecorder::spawn(Arc::clone(&repo), config.download_queue);

    // -- HTTP server --
    let server_config = ServerConfig {
        host: config.host_addr()?,
        port: config.port,
        max_upload_bytes: config.max_upload_bytes(),
        tls,
    };
    let state = AppState {
        repo,
        encoder: Arc::clone(&encoder),
        artifacts,
        ingest,
        recorder: recorder.clone(),
    };
    let server = HttpServer::new(server_config, state);
    let server_run = Arc::clone(&server);
    let mut server_task = tokio::spawn(async move { server_run.run().await });

    tracing::info!(origin = %encoder.origin(), "betadrop ready");

    // -- Main loop: wait for shutdown --
    tokio::select! {
        result = &mut server_task => {
            // The server only returns on its own when it failed to bind or serve.
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(e.into()),
                Err(e) => Err(e.into()),
            };
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, shutting down");
        }
    }

    // -- Graceful shutdown --
    server.shutdown();
    match tokio::time::timeout(DRAIN_TIMEOUT, server_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => tracing::error!("server error: {e}"),
        Ok(Err(e)) => tracing::error!("server task failed: {e}"),
        Err(_) => tracing::warn!("in-flight requests did not finish within {DRAIN_TIMEOUT:?}"),
    }

    if let Err(e) = recorder.flush().await {
        tracing::warn!("download counter flush failed: {e}");
    }
    drop(server);
    drop(recorder);
    if tokio::time::timeout(DRAIN_TIMEOUT, recorder_worker)
        .await
        .is_err()
    {
        tracing::warn!("download recorder did not stop within {DRAIN_TIMEOUT:?}");
    }

    Ok(())
}

fn build_parser(config: &Config) -> Arc<dyn PackageParser> {
    match config
        .parser_command
        .as_deref()
        .and_then(CommandParser::from_command_line)
    {
        Some(parser) => Arc::new(parser),
        None => {
            tracing::warn!("no parser_command configured; uploads will be rejected");
            Arc::new(UnconfiguredParser)
        }
    }
}
