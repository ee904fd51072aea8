//! Bundle model and wire types shared by every betadrop crate.
//!
//! A bundle is one uploaded, parsed application package. Bundles that share
//! a [`GroupKey`] (bundle identifier + platform) are "the same app"; inside a
//! group they are partitioned by version and then by build.

pub mod format;
pub mod payload;
pub mod types;

pub use format::{format_size, format_time, preview_changelog, split_changelog};
pub use payload::{BundleDetail, BundlePayload};
pub use types::{ArtifactKey, ArtifactKind, BundleRecord, GroupKey, Platform};

/// Broad failure classes every crate error maps onto.
///
/// The HTTP layer decides status codes from the class alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad input the caller can correct (e.g. unsupported file type).
    Validation,
    /// Unknown id or version.
    NotFound,
    /// I/O failure; transient but never retried by the core.
    Storage,
    /// Protocol artifact generation failed.
    Encoding,
    /// Something that must never happen (e.g. a duplicate id).
    InvariantViolation,
}

/// Error returned when a platform string or extension is not recognised.
#[derive(Debug, thiserror::Error)]
#[error("unsupported platform: {0}")]
pub struct UnknownPlatform(pub String);
