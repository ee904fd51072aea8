//! Package metadata extraction.
//!
//! Binary parsing of `.ipa` / `.apk` files is delegated. [`PackageParser`]
//! is the seam; [`CommandParser`] runs an external program that prints the
//! metadata as JSON.

use std::path::{Path, PathBuf};
use std::process::Command;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use betadrop_protocol::ErrorClass;
use image::DynamicImage;
use serde::Deserialize;

/// Metadata extracted from a staged package.
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    pub name: String,
    pub bundle_id: String,
    pub version: String,
    pub build: String,
    pub size_bytes: u64,
    pub icon: DynamicImage,
}

/// Errors from package parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no package parser configured")]
    NotConfigured,

    #[error("parser exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("invalid parser output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("invalid icon: {0}")]
    Icon(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),
}

impl ParseError {
    /// Rejected packages are `Validation`; parser setup and I/O failures
    /// are `Storage`.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io(_) | Self::NotConfigured => ErrorClass::Storage,
            Self::Failed { .. } | Self::Output(_) | Self::Icon(_) | Self::MissingField(_) => {
                ErrorClass::Validation
            }
        }
    }
}

/// Extracts metadata from a staged package file.
pub trait PackageParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<PackageMetadata, ParseError>;
}

/// Parser output as printed by the external program.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParserOutput {
    name: String,
    bundle_id: String,
    version: String,
    #[serde(default)]
    build: String,
    /// Base64 PNG or JPEG bytes.
    icon: String,
}

/// Runs `program [args..] <staged path>` and reads JSON from its stdout.
#[derive(Debug, Clone)]
pub struct CommandParser {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandParser {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Builds a parser from a whitespace-separated command line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program, parts.map(str::to_string).collect()))
    }
}

impl PackageParser for CommandParser {
    fn parse(&self, path: &Path) -> Result<PackageMetadata, ParseError> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()?;

        if !output.status.success() {
            return Err(ParseError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let parsed: ParserOutput = serde_json::from_slice(&output.stdout)?;
        let size_bytes = std::fs::metadata(path)?.len();
        metadata_from_output(parsed, size_bytes)
    }
}

fn metadata_from_output(out: ParserOutput, size_bytes: u64) -> Result<PackageMetadata, ParseError> {
    if out.bundle_id.trim().is_empty() {
        return Err(ParseError::MissingField("bundleId"));
    }
    if out.version.trim().is_empty() {
        return Err(ParseError::MissingField("version"));
    }

    let bytes = BASE64
        .decode(out.icon.trim())
        .map_err(|e| ParseError::Icon(e.to_string()))?;
    let icon = image::load_from_memory(&bytes).map_err(|e| ParseError::Icon(e.to_string()))?;

    Ok(PackageMetadata {
        name: out.name,
        bundle_id: out.bundle_id,
        version: out.version,
        build: out.build,
        size_bytes,
        icon,
    })
}

/// Parser used when none is configured; every upload fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredParser;

impl PackageParser for UnconfiguredParser {
    fn parse(&self, _path: &Path) -> Result<PackageMetadata, ParseError> {
        Err(ParseError::NotConfigured)
    }
}
