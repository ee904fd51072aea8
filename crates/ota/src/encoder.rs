//! URL layout and protocol artifacts for a single public origin.

use betadrop_protocol::{BundleDetail, BundlePayload, BundleRecord, Platform};
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::manifest::{self, ManifestUrls};
use crate::{OtaError, PublicOrigin, qr};

/// Characters escaped in a version path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'.')
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// Derives every distribution URL and artifact from a record.
///
/// Deterministic for a given origin; the only time-dependent output is the
/// QR payload, which takes the timestamp explicitly.
#[derive(Debug, Clone)]
pub struct DistributionEncoder {
    origin: PublicOrigin,
}

impl DistributionEncoder {
    pub fn new(origin: PublicOrigin) -> Self {
        Self { origin }
    }

    pub fn origin(&self) -> &PublicOrigin {
        &self.origin
    }

    pub fn bundle_page_url(&self, id: &str) -> String {
        self.origin.join(&format!("/bundle/{id}"))
    }

    pub fn qr_code_url(&self, id: &str) -> String {
        self.origin.join(&format!("/bundle/{id}/qrcode"))
    }

    pub fn manifest_url(&self, id: &str) -> String {
        self.origin.join(&format!("/bundle/{id}/plist"))
    }

    /// Counting endpoint that redirects to the stored package.
    pub fn download_url(&self, id: &str) -> String {
        self.origin.join(&format!("/bundle/{id}/download"))
    }

    pub fn changelog_url(&self, id: &str) -> String {
        self.origin.join(&format!("/bundle/{id}/changelog"))
    }

    pub fn versions_url(&self, id: &str) -> String {
        self.origin.join(&format!("/bundle/{id}/versions"))
    }

    pub fn builds_url(&self, id: &str, version: &str) -> String {
        let version = utf8_percent_encode(version, SEGMENT);
        self.origin.join(&format!("/bundle/{id}/versions/{version}"))
    }

    pub fn icon_url(&self, id: &str) -> String {
        self.origin.join(&format!("/icon/{id}.png"))
    }

    /// Static URL of the stored package file.
    pub fn download_target(&self, record: &BundleRecord) -> String {
        let key = record.package_key();
        self.origin
            .join(&format!("/{}/{}", key.kind.dir_name(), key.file_name()))
    }

    /// URL a device opens to start installation.
    ///
    /// The manifest URL is embedded as is, not percent-encoded.
    pub fn install_url(&self, record: &BundleRecord) -> String {
        match record.platform {
            Platform::Ios => format!(
                "itms-services://?action=download-manifest&url={}",
                self.manifest_url(&record.id)
            ),
            Platform::Android => self.download_url(&record.id),
        }
    }

    /// Text encoded in the QR code: the detail page plus a cache-busting
    /// timestamp.
    pub fn qr_payload(&self, id: &str, now: DateTime<Utc>) -> String {
        format!("{}?_t={}", self.bundle_page_url(id), now.timestamp())
    }

    /// PNG QR code for the detail page of `id`.
    pub fn qr_code(&self, id: &str, now: DateTime<Utc>) -> Result<Vec<u8>, OtaError> {
        qr::render_png(&self.qr_payload(id, now))
    }

    /// iOS install manifest. Android records fail with
    /// [`OtaError::UnsupportedPlatform`].
    pub fn manifest(&self, record: &BundleRecord) -> Result<Vec<u8>, OtaError> {
        let urls = ManifestUrls {
            package: self.download_url(&record.id),
            icon: self.icon_url(&record.id),
        };
        manifest::render(record, &urls)
    }

    /// Wire payload for upload responses and build listings.
    pub fn payload(&self, record: &BundleRecord) -> BundlePayload {
        BundlePayload {
            uuid: record.id.clone(),
            name: record.name.clone(),
            platform: record.platform,
            bundle_id: record.bundle_id.clone(),
            version: record.version.clone(),
            build: record.build.clone(),
            install_url: self.install_url(record),
            qr_code_url: self.qr_code_url(&record.id),
            icon_url: self.icon_url(&record.id),
            changelog: record.changelog.clone(),
            downloads: record.downloads,
        }
    }

    /// Detail view served at the bundle page URL.
    pub fn detail(&self, record: &BundleRecord) -> BundleDetail {
        BundleDetail::new(
            record,
            self.payload(record),
            self.changelog_url(&record.id),
            self.versions_url(&record.id),
        )
    }
}
