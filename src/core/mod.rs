pub mod codec;
pub mod fusion;
pub mod geometry;
pub mod render;

pub use codec::{DetectedSpoof, FusionRequest, SpoofDetectionResult};
pub use fusion::FusionSpoofDetector;
pub use geometry::{AffineTransform, Rect, Size};
