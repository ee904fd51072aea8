//! betadrop server entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_default();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        %host,
        "starting betadrop"
    );

    // Load configuration.
    let config = config::Config::load()?;
    tracing::info!(
        bind = %format!("{}:{}", config.host, config.port),
        public_url = config.public_url.as_deref().unwrap_or("<auto>"),
        tls = config.tls_cert.is_some(),
        data_dir = %config.data_path().display(),
        parser = config.parser_command.as_deref().unwrap_or("<none>"),
        max_upload_mb = config.max_upload_mb,
        "configuration loaded"
    );

    // Build and run the tokio runtime.
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("betadrop shut down cleanly");
    Ok(())
}
