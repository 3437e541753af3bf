use crate::common::{Config, FusionSpoofError, Result};
use crate::core::codec::{FusionRequest, SpoofDetectionResult};
use crate::core::geometry::{AffineTransform, Rect, Size};
use crate::core::render;
use crate::detectors::{FasnetDetector, LocalLivenessDetector, RemoteDeviceWorkingFrame, SpoofDeviceDetector};
use image::DynamicImage;
use reqwest::{header::CONTENT_TYPE, Client, Url};
use std::sync::Arc;
use std::time::Duration;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Combines the on-device FASNet signal with the remote spoof device
/// detector through a single call to the fusion endpoint.
pub struct FusionSpoofDetector {
    /// Advisory only. Callers compare returned scores against it.
    pub confidence_threshold: f32,
    api_key: String,
    url: Url,
    http: Client,
    local: Arc<dyn LocalLivenessDetector>,
    remote: Arc<dyn RemoteDeviceWorkingFrame>,
}

impl FusionSpoofDetector {
    pub fn new(
        api_key: impl Into<String>,
        url: &str,
        local: Arc<dyn LocalLivenessDetector>,
        remote: Arc<dyn RemoteDeviceWorkingFrame>,
    ) -> Result<Self> {
        Self::with_http_client(api_key, url, local, remote, Client::new())
    }

    pub fn with_http_client(
        api_key: impl Into<String>,
        url: &str,
        local: Arc<dyn LocalLivenessDetector>,
        remote: Arc<dyn RemoteDeviceWorkingFrame>,
        http: Client,
    ) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| FusionSpoofError::Config(format!("Invalid service URL {}: {}", url, e)))?;

        Ok(Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            api_key: api_key.into(),
            url,
            http,
            local,
            remote,
        })
    }

    /// Loads the FASNet models and wires up the endpoint from `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.service.timeout_seconds))
            .build()
            .map_err(|e| FusionSpoofError::Config(format!("Failed to build HTTP client: {}", e)))?;

        let mut detector = Self::with_http_client(
            config.service.api_key.clone(),
            &config.service.url,
            Arc::new(FasnetDetector::new(config)?),
            Arc::new(SpoofDeviceDetector::new(config)),
            http,
        )?;
        detector.confidence_threshold = config.service.confidence_threshold;
        Ok(detector)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Spoof confidence for the face at `roi`. Without a face there is
    /// nothing to spoof and the score is 0; no request is made.
    pub async fn detect_spoof(&self, image: &DynamicImage, roi: Option<Rect>) -> Result<f32> {
        let Some(roi) = roi else {
            tracing::debug!("No face in image, skipping spoof detection");
            return Ok(0.0);
        };

        let result = self.detect_spoof_regions(image, roi).await?;
        let score = result.fused_score();
        tracing::debug!(
            "Spoof score {:.3} (fasnet {:.3}, {} spoof devices, fused {:?})",
            score, result.fasnet, result.spoof_devices.len(), result.fused
        );
        Ok(score)
    }

    /// Full endpoint result with spoof device boxes in original image
    /// coordinates.
    pub async fn detect_spoof_regions(&self, image: &DynamicImage, roi: Rect) -> Result<SpoofDetectionResult> {
        let transform = self.working_frame_transform(image)?;
        let body = self.create_request(image, &roi, &transform)?.to_json()?;

        tracing::debug!("Posting {} byte fusion request to {}", body.len(), self.url);
        let response = self
            .http
            .post(self.url.clone())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Fusion request to {} failed: {}", self.url, e);
                self.network_failure()
            })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            tracing::warn!("Fusion endpoint {} returned {}", self.url, status);
            return Err(self.network_failure());
        }

        let data = response.bytes().await.map_err(|e| {
            tracing::warn!("Failed to read fusion response from {}: {}", self.url, e);
            self.network_failure()
        })?;

        let reverse = transform
            .inverted()
            .ok_or_else(|| FusionSpoofError::image_processing("invert working frame transform"))?;

        Ok(SpoofDetectionResult::from_json(&data)?.map_bounding_boxes(&reverse))
    }

    /// Letterbox transform from `image` into the remote detector's frame.
    pub fn working_frame_transform(&self, image: &DynamicImage) -> Result<AffineTransform> {
        let size = Size::new(image.width() as f32, image.height() as f32);
        AffineTransform::letterbox(size, self.remote.working_frame_size()).ok_or_else(|| {
            FusionSpoofError::image_processing(format!(
                "map {}x{} image into {} px working frame",
                image.width(), image.height(), self.remote.working_frame_size()
            ))
        })
    }

    pub fn create_request(&self, image: &DynamicImage, roi: &Rect, transform: &AffineTransform) -> Result<FusionRequest> {
        let fasnet_images = self
            .local
            .create_inference_images(image, roi)?
            .iter()
            .map(render::encode_jpeg)
            .collect::<Result<Vec<_>>>()?;

        let canvas = render::render_letterboxed(image, self.remote.working_frame_size(), transform)?;
        let spoof_device_image = render::encode_rgb_jpeg(&canvas)?;

        Ok(FusionRequest::new(fasnet_images, spoof_device_image, transform.apply_to_rect(roi)))
    }

    fn network_failure(&self) -> FusionSpoofError {
        FusionSpoofError::NetworkRequestFailed { url: self.url.to_string() }
    }
}
