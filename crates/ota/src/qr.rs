//! QR code rendering.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};

use crate::OtaError;

/// Side length in pixels of every rendered QR image.
pub const QR_CANVAS_SIZE: u32 = 160;

/// Modules of white border on each side of the symbol.
const QUIET_ZONE: u32 = 4;

pub const QR_CONTENT_TYPE: &str = "image/png";

/// Renders `data` as a PNG QR code on a white 160x160 canvas.
///
/// The symbol uses error-correction level L and is scaled by the largest
/// integer factor that fits, then centred. Payloads too large to fit at one
/// pixel per module fail with [`OtaError::EncodingFailed`].
pub fn render_png(data: &str) -> Result<Vec<u8>, OtaError> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)?;
    let width = u32::try_from(code.width())
        .map_err(|_| OtaError::EncodingFailed("QR symbol too large".into()))?;

    let span = width + 2 * QUIET_ZONE;
    let scale = QR_CANVAS_SIZE / span;
    if scale == 0 {
        return Err(OtaError::EncodingFailed(format!(
            "QR symbol of {width} modules does not fit a {QR_CANVAS_SIZE}px canvas"
        )));
    }
    let offset = (QR_CANVAS_SIZE - width * scale) / 2;

    let mut canvas = GrayImage::from_pixel(QR_CANVAS_SIZE, QR_CANVAS_SIZE, Luma([255]));
    for (i, color) in code.to_colors().into_iter().enumerate() {
        if color != Color::Dark {
            continue;
        }
        let i = i as u32;
        let (mx, my) = (i % width, i / width);
        for dy in 0..scale {
            for dx in 0..scale {
                canvas.put_pixel(offset + mx * scale + dx, offset + my * scale + dy, Luma([0]));
            }
        }
    }

    let mut png = Vec::new();
    DynamicImage::ImageLuma8(canvas).write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}
