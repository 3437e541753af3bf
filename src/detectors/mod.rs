//! Detector capabilities the fusion client depends on.
//!
//! The fusion client only needs two things from the detectors: the local
//! liveness model's inference crops (and, for offline use, its score), and
//! the fixed square frame size the remote device detector expects.

pub mod fasnet;
pub mod spoof_device;

use crate::common::Result;
use crate::core::geometry::Rect;
use image::DynamicImage;

pub use fasnet::FasnetDetector;
pub use spoof_device::SpoofDeviceDetector;

pub trait LocalLivenessDetector: Send + Sync {
    /// Cuts the inference-ready sub-images for `roi` out of `image`.
    ///
    /// Fails with `ImageProcessingFailed` when the ROI cannot be cropped.
    fn create_inference_images(&self, image: &DynamicImage, roi: &Rect) -> Result<Vec<DynamicImage>>;

    /// Spoof score in `[0, 1]` for images produced by `create_inference_images`.
    fn local_score(&self, inference_images: &[DynamicImage]) -> Result<f32>;
}

pub trait RemoteDeviceWorkingFrame: Send + Sync {
    /// Side length of the square input the remote device detector expects.
    fn working_frame_size(&self) -> u32;
}
