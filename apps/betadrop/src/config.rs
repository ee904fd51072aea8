//! Server configuration management.
//!
//! Configuration is stored as TOML at `$BETADROP_CONFIG` when set,
//! otherwise `~/.config/betadrop/server.toml`. A default file is written on
//! first start.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use betadrop_server::TlsConfig;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV: &str = "BETADROP_CONFIG";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// PEM certificate chain for HTTPS. Set together with `tls_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert: Option<String>,

    /// PEM private key for HTTPS.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_key: Option<String>,

    /// Public origin devices use to reach the server, e.g.
    /// `https://ota.example.com`. Falls back to the first LAN address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,

    /// Directory holding the database, packages and icons. `~` expands to
    /// the home directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Database file name inside `data_dir`.
    #[serde(default = "default_database")]
    pub database: String,

    /// External package parser command line. The staged package path is
    /// appended as the last argument.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser_command: Option<String>,

    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,

    /// Capacity of the download counter queue.
    #[serde(default = "default_download_queue")]
    pub download_queue: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8443
}

fn default_data_dir() -> String {
    "~/.local/share/betadrop".into()
}

fn default_database() -> String {
    "betadrop.db".into()
}

fn default_max_upload_mb() -> u64 {
    1024
}

fn default_download_queue() -> usize {
    betadrop_store::DEFAULT_QUEUE_CAPACITY
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            tls_cert: None,
            tls_key: None,
            public_url: None,
            data_dir: default_data_dir(),
            database: default_database(),
            parser_command: None,
            max_upload_mb: default_max_upload_mb(),
            download_queue: default_download_queue(),
        }
    }
}

impl Config {
    /// Loads configuration from disk, or creates a default if not found.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Writes the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        // Restrict permissions on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn host_addr(&self) -> anyhow::Result<IpAddr> {
        self.host
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid host {:?}: {e}", self.host))
    }

    /// `data_dir` with a leading `~` expanded.
    pub fn data_path(&self) -> PathBuf {
        expand_home(&self.data_dir)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_path().join(&self.database)
    }

    /// Certificate and key paths when HTTPS is enabled. Setting only one of
    /// them is an error.
    pub fn tls(&self) -> anyhow::Result<Option<TlsConfig>> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Ok(Some(TlsConfig {
                cert: expand_home(cert),
                key: expand_home(key),
            })),
            (None, None) => Ok(None),
            _ => anyhow::bail!("tls_cert and tls_key must be set together"),
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

fn home_dir() -> PathBuf {
    PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| "/tmp".into()))
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        home_dir()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}

/// Returns the configuration file path.
fn config_path() -> PathBuf {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => home_dir().join(".config").join("betadrop").join("server.toml"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8443);
        assert!(config.public_url.is_none());
        assert_eq!(config.database, "betadrop.db");
        assert!(config.parser_command.is_none());
        assert_eq!(config.max_upload_mb, 1024);
        assert_eq!(config.download_queue, betadrop_store::DEFAULT_QUEUE_CAPACITY);
        assert!(config.tls_cert.is_none() && config.tls_key.is_none());
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = Config {
            host: "127.0.0.1".into(),
            port: 9000,
            tls_cert: Some("/etc/betadrop/cert.pem".into()),
            tls_key: Some("/etc/betadrop/key.pem".into()),
            public_url: Some("https://ota.example.com".into()),
            data_dir: "/srv/betadrop".into(),
            database: "bundles.db".into(),
            parser_command: Some("ipapk-parse --json".into()),
            max_upload_mb: 64,
            download_queue: 8,
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn config_partial_toml() {
        // Only specify the port, rest should use defaults.
        let config: Config = toml::from_str("port = 8080").unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.data_dir, "~/.local/share/betadrop");
    }

    #[test]
    fn load_creates_default_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("server.toml");

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn paths_and_limits() {
        let config = Config {
            data_dir: "/srv/betadrop".into(),
            max_upload_mb: 2,
            ..Config::default()
        };
        assert_eq!(config.database_path(), PathBuf::from("/srv/betadrop/betadrop.db"));
        assert_eq!(config.max_upload_bytes(), 2 * 1024 * 1024);
        assert!(config.host_addr().unwrap().is_unspecified());
    }

    #[test]
    fn tilde_expands_to_home() {
        let expanded = expand_home("~/data");
        assert!(expanded.ends_with("data"));
        assert!(!expanded.starts_with("~"));
        assert_eq!(expand_home("/abs"), PathBuf::from("/abs"));
    }

    #[test]
    fn tls_needs_cert_and_key() {
        assert!(Config::default().tls().unwrap().is_none());

        let config = Config {
            tls_cert: Some("/srv/tls/cert.pem".into()),
            tls_key: Some("~/tls/key.pem".into()),
            ..Config::default()
        };
        let tls = config.tls().unwrap().unwrap();
        assert_eq!(tls.cert, PathBuf::from("/srv/tls/cert.pem"));
        assert!(!tls.key.starts_with("~"));

        let half = Config {
            tls_cert: Some("/srv/tls/cert.pem".into()),
            ..Config::default()
        };
        assert!(half.tls().is_err());
    }

    #[test]
    fn invalid_host_rejected() {
        let config = Config {
            host: "not-an-ip".into(),
            ..Config::default()
        };
        assert!(config.host_addr().is_err());
    }
}
