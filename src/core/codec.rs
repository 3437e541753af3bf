//! JSON wire format of the fusion endpoint.
//!
//! Binary image payloads travel as standard (padded) base64 strings.

use crate::common::{FusionSpoofError, Result};
use crate::core::geometry::{AffineTransform, Rect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct FusionRequest {
    pub fasnet: FasnetBody,
    pub spoof_device: SpoofDeviceBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct FasnetBody {
    #[serde(serialize_with = "base64_bytes::serialize_all")]
    pub images: Vec<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpoofDeviceBody {
    #[serde(serialize_with = "base64_bytes::serialize")]
    pub image: Vec<u8>,
    pub roi: Rect,
}

impl FusionRequest {
    pub fn new(fasnet_images: Vec<Vec<u8>>, spoof_device_image: Vec<u8>, spoof_device_roi: Rect) -> Self {
        Self {
            fasnet: FasnetBody { images: fasnet_images },
            spoof_device: SpoofDeviceBody {
                image: spoof_device_image,
                roi: spoof_device_roi,
            },
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(FusionSpoofError::Encode)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedSpoof {
    #[serde(rename = "boundingBox")]
    pub bounding_box: Rect,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpoofDetectionResult {
    pub fasnet: f32,
    pub spoof_devices: Vec<DetectedSpoof>,
    #[serde(default)]
    pub fused: Option<f32>,
}

impl SpoofDetectionResult {
    pub fn from_json(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(FusionSpoofError::Decode)
    }

    /// The endpoint's fused score when present, otherwise the larger of the
    /// FASNet score and the strongest spoof device.
    pub fn fused_score(&self) -> f32 {
        if let Some(fused) = self.fused {
            return fused;
        }

        match self.spoof_devices.iter().map(|d| d.confidence).reduce(f32::max) {
            Some(device_score) => self.fasnet.max(device_score),
            None => self.fasnet,
        }
    }

    /// Maps every spoof device box through `transform`.
    pub fn map_bounding_boxes(self, transform: &AffineTransform) -> Self {
        let spoof_devices = self
            .spoof_devices
            .into_iter()
            .map(|device| DetectedSpoof {
                bounding_box: transform.apply_to_rect(&device.bounding_box),
                confidence: device.confidence,
            })
            .collect();

        Self { spoof_devices, ..self }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{ser::SerializeSeq, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn serialize_all<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&STANDARD.encode(item))?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn device(confidence: f32) -> DetectedSpoof {
        DetectedSpoof { bounding_box: Rect::new(0.0, 0.0, 10.0, 10.0), confidence }
    }

    #[test]
    fn request_uses_wire_field_names() {
        let request = FusionRequest::new(
            vec![vec![1, 2, 3], vec![0xFF]],
            b"jpeg".to_vec(),
            Rect::new(1.5, 2.0, 30.0, 40.25),
        );
        let value: Value = serde_json::from_slice(&request.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "fasnet": { "images": ["AQID", "/w=="] },
                "spoof_device": {
                    "image": "anBlZw==",
                    "roi": { "x": 1.5, "y": 2.0, "width": 30.0, "height": 40.25 }
                }
            })
        );
    }

    #[test]
    fn decodes_full_response() {
        let body = br#"{
            "fasnet": 0.25,
            "spoof_devices": [{ "boundingBox": { "x": 1, "y": 2, "width": 3, "height": 4 }, "confidence": 0.9 }],
            "fused": 0.7
        }"#;
        let result = SpoofDetectionResult::from_json(body).unwrap();
        assert_eq!(result.fasnet, 0.25);
        assert_eq!(result.fused, Some(0.7));
        assert_eq!(result.spoof_devices, vec![DetectedSpoof {
            bounding_box: Rect::new(1.0, 2.0, 3.0, 4.0),
            confidence: 0.9,
        }]);
    }

    #[test]
    fn fused_may_be_null_or_missing() {
        let null = SpoofDetectionResult::from_json(br#"{"fasnet":0.1,"spoof_devices":[],"fused":null}"#).unwrap();
        let missing = SpoofDetectionResult::from_json(br#"{"fasnet":0.1,"spoof_devices":[]}"#).unwrap();
        assert_eq!(null.fused, None);
        assert_eq!(missing.fused, None);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let bodies: [&[u8]; 3] = [b"not json", br#"{"spoof_devices":[]}"#, br#"{"fasnet":"high","spoof_devices":[]}"#];
        for body in bodies {
            assert!(matches!(SpoofDetectionResult::from_json(body), Err(FusionSpoofError::Decode(_))));
        }
    }

    #[test]
    fn fused_score_takes_precedence() {
        let result = SpoofDetectionResult { fasnet: 0.1, spoof_devices: vec![device(0.99)], fused: Some(0.83) };
        assert_eq!(result.fused_score(), 0.83);
    }

    #[test]
    fn falls_back_to_max_of_fasnet_and_devices() {
        let result = SpoofDetectionResult { fasnet: 0.4, spoof_devices: vec![device(0.2), device(0.6)], fused: None };
        assert_eq!(result.fused_score(), 0.6);

        let result = SpoofDetectionResult { fasnet: 0.7, spoof_devices: vec![device(0.2)], fused: None };
        assert_eq!(result.fused_score(), 0.7);
    }

    #[test]
    fn falls_back_to_fasnet_without_devices() {
        let result = SpoofDetectionResult { fasnet: 0.3, spoof_devices: vec![], fused: None };
        assert_eq!(result.fused_score(), 0.3);
    }

    #[test]
    fn maps_boxes_keeping_confidence() {
        let result = SpoofDetectionResult { fasnet: 0.3, spoof_devices: vec![device(0.5)], fused: None };
        let mapped = result.map_bounding_boxes(&AffineTransform::scale_translate(2.0, 5.0, 0.0));
        assert_eq!(mapped.spoof_devices[0].bounding_box, Rect::new(5.0, 0.0, 20.0, 20.0));
        assert_eq!(mapped.spoof_devices[0].confidence, 0.5);
        assert_eq!(mapped.fasnet, 0.3);
    }
}
