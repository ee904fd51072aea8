use serde::{Deserialize, Serialize};

use crate::format::{format_size, format_time, preview_changelog, split_changelog};
use crate::types::{BundleRecord, Platform};

/// JSON payload returned by upload and build listings.
///
/// Field names are part of the public contract with existing clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlePayload {
    pub uuid: String,
    pub name: String,
    pub platform: Platform,
    pub bundle_id: String,
    pub version: String,
    pub build: String,
    pub install_url: String,
    pub qr_code_url: String,
    pub icon_url: String,
    pub changelog: String,
    pub downloads: u64,
}

/// Detail view of a single bundle: the payload plus display-ready fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDetail {
    #[serde(flatten)]
    pub bundle: BundlePayload,
    pub size: String,
    pub uploaded_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changelog_preview: Vec<String>,
    pub changelog_url: String,
    pub versions_url: String,
}

impl BundleDetail {
    /// Builds the detail view from a record, its already-encoded payload and
    /// the links to its changelog and version list.
    pub fn new(
        record: &BundleRecord,
        bundle: BundlePayload,
        changelog_url: String,
        versions_url: String,
    ) -> Self {
        let lines = split_changelog(&record.changelog);
        Self {
            bundle,
            size: format_size(record.size_bytes),
            uploaded_at: format_time(&record.created_at),
            changelog_preview: preview_changelog(&lines).to_vec(),
            changelog_url,
            versions_url,
        }
    }
}
