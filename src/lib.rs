pub mod core;
pub mod detectors;
pub mod cli;
pub mod common;

// Re-export commonly used types
pub use common::{Config, FusionSpoofError, Result};
pub use crate::core::{
    AffineTransform, DetectedSpoof, FusionRequest, FusionSpoofDetector, Rect, Size,
    SpoofDetectionResult,
};
pub use detectors::{FasnetDetector, LocalLivenessDetector, RemoteDeviceWorkingFrame, SpoofDeviceDetector};
