use crate::common::{FusionSpoofError, Result};
use crate::core::{Rect, SpoofDetectionResult};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as DrawRect;
use std::path::PathBuf;

const ROI_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const SPOOF_DEVICE_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Parses `x,y,width,height`.
pub fn parse_roi(value: &str) -> Result<Rect> {
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| FusionSpoofError::Config(format!("Invalid ROI '{}': {}", value, e)))?;

    match parts.as_slice() {
        &[x, y, width, height] => {
            let roi = Rect::new(x, y, width, height);
            if !roi.is_valid() {
                return Err(FusionSpoofError::Config(format!(
                    "ROI width and height must be positive, got '{}'", value
                )));
            }
            Ok(roi)
        }
        _ => Err(FusionSpoofError::Config(format!(
            "ROI must be x,y,width,height, got '{}'", value
        ))),
    }
}

/// Draws the face ROI in green and each spoof device in red.
pub fn annotate_detections(image: &DynamicImage, roi: &Rect, result: &SpoofDetectionResult) -> RgbImage {
    let mut canvas = image.to_rgb8();

    if let Some(rect) = to_draw_rect(roi) {
        draw_hollow_rect_mut(&mut canvas, rect, ROI_COLOR);
    }
    for device in &result.spoof_devices {
        if let Some(rect) = to_draw_rect(&device.bounding_box) {
            draw_hollow_rect_mut(&mut canvas, rect, SPOOF_DEVICE_COLOR);
        }
    }

    canvas
}

pub fn default_annotation_path(prefix: &str) -> PathBuf {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("{}_{}.jpg", prefix, timestamp))
}

fn to_draw_rect(rect: &Rect) -> Option<DrawRect> {
    if !rect.is_valid() {
        return None;
    }
    let width = (rect.width.round() as u32).max(1);
    let height = (rect.height.round() as u32).max(1);
    Some(DrawRect::at(rect.x.round() as i32, rect.y.round() as i32).of_size(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DetectedSpoof;

    #[test]
    fn parses_roi() {
        assert_eq!(parse_roi("1020, 1420,1070,1350.5").unwrap(), Rect::new(1020.0, 1420.0, 1070.0, 1350.5));
    }

    #[test]
    fn rejects_bad_roi() {
        assert!(parse_roi("1,2,3").is_err());
        assert!(parse_roi("a,b,c,d").is_err());
        assert!(parse_roi("0,0,0,10").is_err());
    }

    #[test]
    fn draws_roi_and_devices() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(100, 100));
        let result = SpoofDetectionResult {
            fasnet: 0.1,
            spoof_devices: vec![DetectedSpoof { bounding_box: Rect::new(50.0, 50.0, 20.0, 20.0), confidence: 0.9 }],
            fused: None,
        };
        let canvas = annotate_detections(&image, &Rect::new(10.0, 10.0, 30.0, 30.0), &result);

        assert_eq!(canvas.get_pixel(10, 20), &ROI_COLOR);
        assert_eq!(canvas.get_pixel(50, 60), &SPOOF_DEVICE_COLOR);
        assert_eq!(canvas.get_pixel(25, 25), &Rgb([0, 0, 0]));
    }
}
