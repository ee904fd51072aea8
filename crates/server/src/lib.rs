//! HTTP surface for betadrop.
//!
//! Thin axum layer over the core crates: handlers validate path input, run
//! blocking core calls on tokio's blocking pool and map core errors onto
//! status codes through their [`ErrorClass`](betadrop_protocol::ErrorClass).

mod error;
mod handlers;
mod routes;
mod server;
mod state;

pub use error::ApiError;
pub use routes::router;
pub use server::{HttpServer, ServerConfig, TlsConfig};
pub use state::AppState;

/// Errors produced by the HTTP server itself.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to load TLS certificate {cert} / key {key}: {source}")]
    Tls {
        cert: std::path::PathBuf,
        key: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("server already running")]
    AlreadyRunning,
}
