use crate::common::{FusionSpoofError, Result};
use crate::core::geometry::{AffineTransform, Rect};
use image::{codecs::jpeg::JpegEncoder, imageops::{self, FilterType}, ColorType, DynamicImage, Rgb, RgbImage};

/// Quality used for every transport JPEG.
pub const TRANSPORT_JPEG_QUALITY: u8 = 100;

/// Renders `image` onto a black `side` x `side` canvas at the location the
/// transform maps the image bounds to.
pub fn render_letterboxed(image: &DynamicImage, side: u32, transform: &AffineTransform) -> Result<RgbImage> {
    if side == 0 || image.width() == 0 || image.height() == 0 {
        return Err(FusionSpoofError::image_processing("render letterboxed canvas"));
    }

    let bounds = Rect::new(0.0, 0.0, image.width() as f32, image.height() as f32);
    let placed = transform.apply_to_rect(&bounds);
    if !placed.is_valid() {
        return Err(FusionSpoofError::image_processing("render letterboxed canvas"));
    }

    let mut canvas = RgbImage::from_pixel(side, side, Rgb([0, 0, 0]));

    let target_width = (placed.width.round() as u32).max(1);
    let target_height = (placed.height.round() as u32).max(1);
    let rgb = image.to_rgb8();
    let scaled = if target_width == rgb.width() && target_height == rgb.height() {
        rgb
    } else {
        imageops::resize(&rgb, target_width, target_height, FilterType::Triangle)
    };

    imageops::overlay(&mut canvas, &scaled, placed.x.round() as i64, placed.y.round() as i64);
    Ok(canvas)
}

pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    encode_rgb_jpeg(&image.to_rgb8())
}

pub fn encode_rgb_jpeg(image: &RgbImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, TRANSPORT_JPEG_QUALITY)
        .encode(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
        .map_err(|e| FusionSpoofError::image_processing(format!("encode JPEG: {}", e)))?;
    Ok(buffer)
}
