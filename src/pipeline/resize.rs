//! Resizing: derive smaller variants from one high-resolution render.
//!
//! Page 1 is rasterised once at the largest preview width and every smaller
//! preview is produced here. Lanczos3 keeps small type legible at thumbnail
//! sizes where a triangle filter would blur it.

use image::imageops::FilterType;
use image::DynamicImage;

/// Scale `img` to `width` pixels wide, preserving aspect ratio.
///
/// Never upscales: an image already at or below `width` is returned as-is.
pub fn resize_to_width(img: &DynamicImage, width: u32) -> DynamicImage {
    if width == 0 || img.width() <= width {
        return img.clone();
    }
    let height = scaled_height(img.width(), img.height(), width);
    img.resize_exact(width, height, FilterType::Lanczos3)
}

/// Height matching `target_width` at the source aspect ratio, at least 1 px.
pub fn scaled_height(src_width: u32, src_height: u32, target_width: u32) -> u32 {
    if src_width == 0 {
        return 1;
    }
    let h = (src_height as u64 * target_width as u64 + src_width as u64 / 2) / src_width as u64;
    h.max(1) as u32
}
