//! Image encoding: `DynamicImage` → JPEG bytes for the bucket.
//!
//! Previews are served straight to browsers, so JPEG at a moderate quality is
//! the right trade against PNG's size on photographic print artwork. Alpha is
//! flattened first since JPEG has no transparency channel.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use tracing::debug;

/// Content type stored alongside every generated image.
pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Encode `img` as JPEG at `quality` (1–100).
pub fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes, image::ImageError> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)?;

    debug!(
        "Encoded {}x{} image → {} bytes JPEG (q={})",
        rgb.width(),
        rgb.height(),
        buf.len(),
        quality
    );
    Ok(Bytes::from(buf))
}
