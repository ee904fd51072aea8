//! HTTP listener lifecycle.
//!
//! Binds a TCP port, serves the router (over TLS when a certificate is
//! configured) until cancelled, then stops accepting and lets in-flight
//! requests finish.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::ServerError;
use crate::routes::router;
use crate::state::AppState;

/// PEM certificate chain and private key for the HTTPS listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    /// TCP port to listen on (0 = OS-assigned).
    pub port: u16,
    pub max_upload_bytes: usize,
    /// Serve HTTPS instead of plain HTTP.
    pub tls: Option<TlsConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 0,
            max_upload_bytes: 1024 * 1024 * 1024,
            tls: None,
        }
    }
}

/// The betadrop HTTP server.
pub struct HttpServer {
    config: ServerConfig,
    state: AppState,
    cancel: CancellationToken,
    local_addr: Mutex<Option<SocketAddr>>,
    running: AtomicBool,
}

impl HttpServer {
    pub fn new(config: ServerConfig, state: AppState) -> Arc<Self> {
        Arc::new(Self {
            config,
            state,
            cancel: CancellationToken::new(),
            local_addr: Mutex::new(None),
            running: AtomicBool::new(false),
        })
    }

    /// Returns the local address the server is listening on.
    ///
    /// Only available after [`run`](Self::run) binds the socket.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock().await
    }

    /// Returns the listening port (0 if not yet bound).
    pub async fn port(&self) -> u16 {
        self.local_addr.lock().await.map(|a| a.port()).unwrap_or(0)
    }

    /// Gracefully shuts down the server.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Runs the server until cancellation.
    pub async fn run(self: &Arc<Self>) -> Result<(), ServerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ServerError::AlreadyRunning);
        }
        let result = self.bind_and_serve().await;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    async fn bind_and_serve(&self) -> Result<(), ServerError> {
        // Certificates are loaded before binding so a bad path fails fast.
        let tls = match &self.config.tls {
            Some(tls) => Some(load_tls(tls).await?),
            None => None,
        };

        let addr = SocketAddr::new(self.config.host, self.config.port);
        let listener = TcpListener::bind(addr).await?;

        let local_addr = listener.local_addr()?;
        *self.local_addr.lock().await = Some(local_addr);

        let app = router(self.state.clone(), self.config.max_upload_bytes);
        match tls {
            Some(tls) => {
                tracing::info!("betadrop listening on https://{local_addr}");
                self.serve_tls(listener, app, tls).await
            }
            None => {
                tracing::info!("betadrop listening on http://{local_addr}");
                self.serve_plain(listener, app).await
            }
        }
    }

    async fn serve_plain(&self, listener: TcpListener, app: Router) -> Result<(), ServerError> {
        let cancel = self.cancel.clone();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("server shutting down");
            })
            .await?;
        Ok(())
    }

    async fn serve_tls(
        &self,
        listener: TcpListener,
        app: Router,
        tls: RustlsConfig,
    ) -> Result<(), ServerError> {
        let handle = axum_server::Handle::new();
        let cancel = self.cancel.clone();
        let shutdown = handle.clone();
        let watcher = tokio::spawn(async move {
            cancel.cancelled().await;
            tracing::info!("server shutting down");
            shutdown.graceful_shutdown(None);
        });

        let result = axum_server::tls_rustls::from_tcp_rustls(listener.into_std()?, tls)
            .handle(handle)
            .serve(app.into_make_service())
            .await;
        watcher.abort();
        Ok(result?)
    }
}

async fn load_tls(tls: &TlsConfig) -> Result<RustlsConfig, ServerError> {
    // Errors only when a provider is already installed.
    let _ = rustls::crypto::ring::default_provider().install_default();
    RustlsConfig::from_pem_file(&tls.cert, &tls.key)
        .await
        .map_err(|source| ServerError::Tls {
            cert: tls.cert.clone(),
            key: tls.key.clone(),
            source,
        })
}
