use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UnknownPlatform;

/// Target platform of an uploaded package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "ios")]
    Ios,
    #[serde(rename = "android")]
    Android,
}

impl Platform {
    /// Maps an uploaded file extension to its platform.
    ///
    /// Accepts the extension with or without the leading dot, any case.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        if ext.eq_ignore_ascii_case("ipa") {
            Some(Self::Ios)
        } else if ext.eq_ignore_ascii_case("apk") {
            Some(Self::Android)
        } else {
            None
        }
    }

    /// Package file extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Ios => "ipa",
            Self::Android => "apk",
        }
    }

    /// Stable lowercase name, used on the wire and in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }

    /// MIME type the stored package is served with.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Ios => "application/octet-stream",
            Self::Android => "application/vnd.android.package-archive",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ios" => Ok(Self::Ios),
            "android" => Ok(Self::Android),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

/// Identifies "the same app" across uploads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub bundle_id: String,
    pub platform: Platform,
}

impl GroupKey {
    pub fn new(bundle_id: impl Into<String>, platform: Platform) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            platform,
        }
    }
}

/// Kind of file stored alongside a bundle record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The uploaded package (`.ipa` / `.apk`).
    Package(Platform),
    /// The PNG icon extracted from the package.
    Icon,
}

impl ArtifactKind {
    /// Directory holding packages of every platform.
    pub const PACKAGE_DIR: &'static str = "app";
    pub const ICON_DIR: &'static str = "icon";

    /// Storage sub-directory for this kind.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Package(_) => Self::PACKAGE_DIR,
            Self::Icon => Self::ICON_DIR,
        }
    }

    /// File extension for this kind.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Package(platform) => platform.extension(),
            Self::Icon => "png",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Package(platform) => platform.content_type(),
            Self::Icon => "image/png",
        }
    }
}

/// Content reference from a record to one of its stored files.
///
/// The record only knows the key; artifact storage resolves it to bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactKey {
    pub id: String,
    pub kind: ArtifactKind,
}

impl ArtifactKey {
    /// File name the artifact is stored and served under (`{id}.{ext}`).
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.kind.extension())
    }
}

/// One uploaded artifact and its extracted metadata.
///
/// Immutable after creation except for `downloads`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleRecord {
    pub id: String,
    pub platform: Platform,
    pub name: String,
    pub bundle_id: String,
    pub version: String,
    pub build: String,
    pub size_bytes: u64,
    pub changelog: String,
    pub downloads: u64,
    pub created_at: DateTime<Utc>,
}

impl BundleRecord {
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(self.bundle_id.clone(), self.platform)
    }

    pub fn package_key(&self) -> ArtifactKey {
        ArtifactKey {
            id: self.id.clone(),
            kind: ArtifactKind::Package(self.platform),
        }
    }

    pub fn icon_key(&self) -> ArtifactKey {
        ArtifactKey {
            id: self.id.clone(),
            kind: ArtifactKind::Icon,
        }
    }
}
