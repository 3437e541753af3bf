pub mod annotate;

pub use annotate::{annotate_detections, default_annotation_path, parse_roi};
