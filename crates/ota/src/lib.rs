//! Over-the-air distribution protocol.
//!
//! Everything a device needs to install a bundle is derived here from a
//! [`BundleRecord`](betadrop_protocol::BundleRecord) and the server's
//! [`PublicOrigin`]: install URLs, the QR code pointing at the detail page,
//! and the iOS `itms-services` manifest. The encoder is pure; it never
//! touches the repository or the file system.

pub mod encoder;
pub mod manifest;
pub mod origin;
pub mod qr;

use betadrop_protocol::{ErrorClass, Platform};

pub use encoder::DistributionEncoder;
pub use manifest::MANIFEST_CONTENT_TYPE;
pub use origin::{PublicOrigin, get_local_ips};
pub use qr::{QR_CANVAS_SIZE, QR_CONTENT_TYPE};

/// Errors produced while encoding distribution artifacts.
#[derive(Debug, thiserror::Error)]
pub enum OtaError {
    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    #[error("unsupported platform for this artifact: {0}")]
    UnsupportedPlatform(Platform),

    #[error("invalid public origin: {0}")]
    InvalidOrigin(String),
}

impl OtaError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::EncodingFailed(_) => ErrorClass::Encoding,
            Self::UnsupportedPlatform(_) => ErrorClass::NotFound,
            Self::InvalidOrigin(_) => ErrorClass::Validation,
        }
    }
}

impl From<image::ImageError> for OtaError {
    fn from(e: image::ImageError) -> Self {
        Self::EncodingFailed(format!("image: {e}"))
    }
}

impl From<plist::Error> for OtaError {
    fn from(e: plist::Error) -> Self {
        Self::EncodingFailed(format!("plist: {e}"))
    }
}

impl From<qrcode::types::QrError> for OtaError {
    fn from(e: qrcode::types::QrError) -> Self {
        Self::EncodingFailed(format!("qr: {e}"))
    }
}
