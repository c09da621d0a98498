//! Image encoding: embedded images → base64 `data:` URIs for inline HTML.
//!
//! Decoded bitmaps (PDF images, OCR page scans) are re-encoded as JPEG at
//! the configured quality; alpha is dropped first since JPEG has none.
//! Images that arrive already encoded (DOCX media) are embedded byte for
//! byte.

use crate::document::ImageSource;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Encode a bitmap as JPEG bytes at `quality` (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    let rgb = img.to_rgb8();
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100)).encode_image(&rgb)?;
    Ok(buf)
}

/// Build a `data:<mime>;base64,...` URI for an image.
pub fn encode_data_uri(source: &ImageSource, quality: u8) -> Result<String, image::ImageError> {
    let (mime, bytes) = match source {
        ImageSource::Bitmap(img) => ("image/jpeg", encode_jpeg(img, quality)?),
        ImageSource::Encoded { mime, bytes } => {
            return Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)));
        }
    };
    let b64 = STANDARD.encode(&bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    Ok(format!("data:{mime};base64,{b64}"))
}
