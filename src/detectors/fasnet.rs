use crate::common::{Config, FusionSpoofError, Result};
use crate::core::geometry::Rect;
use crate::detectors::LocalLivenessDetector;
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array4, CowArray};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder, Value};
use std::sync::Arc;

/// Index of the "live" class in the MiniFASNet output.
const LIVE_CLASS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FasnetCropSpec {
    /// Crop size relative to the face box.
    pub scale: f32,
    /// Side of the square model input.
    pub input_size: u32,
}

struct FasnetModel {
    session: Session,
    crop: FasnetCropSpec,
}

/// On-device MiniFASNet ensemble. Each model sees its own crop of the face.
pub struct FasnetDetector {
    models: Vec<FasnetModel>,
    _environment: Arc<Environment>,
}

impl FasnetDetector {
    pub fn new(config: &Config) -> Result<Self> {
        let environment = Arc::new(
            Environment::builder()
                .with_name("fasnet")
                .build()
                .map_err(|e| FusionSpoofError::Model(format!("Failed to create environment: {}", e)))?
        );

        let mut models = Vec::with_capacity(config.fasnet.models.len());
        for model in &config.fasnet.models {
            if !model.path.exists() {
                return Err(FusionSpoofError::Model(
                    format!("FASNet model not found at: {:?}", model.path)
                ));
            }

            let session = SessionBuilder::new(&environment)?
                .with_optimization_level(optimization_level(config.fasnet.optimization_level))?
                .with_model_from_file(&model.path)?;

            tracing::debug!("Loaded FASNet model {:?} (scale {})", model.path, model.scale);
            models.push(FasnetModel {
                session,
                crop: FasnetCropSpec { scale: model.scale, input_size: model.input_size },
            });
        }

        Ok(Self { models, _environment: environment })
    }

    pub fn crop_specs(&self) -> Vec<FasnetCropSpec> {
        self.models.iter().map(|m| m.crop).collect()
    }

    fn predict(&self, model: &FasnetModel, image: &DynamicImage) -> Result<Vec<f32>> {
        let size = model.crop.input_size;
        if image.width() != size || image.height() != size {
            return Err(FusionSpoofError::image_processing(format!(
                "FASNet input must be {}x{}, got {}x{}", size, size, image.width(), image.height()
            )));
        }

        let input_array = image_to_bgr_array(image);
        let cow_array = CowArray::from(input_array.into_dyn());
        let input_tensor = Value::from_array(model.session.allocator(), &cow_array)?;
        let outputs = model.session.run(vec![input_tensor])?;

        let logits: Vec<f32> = outputs
            .first()
            .ok_or_else(|| FusionSpoofError::Model("FASNet produced no output".into()))?
            .try_extract::<f32>()?
            .view()
            .iter()
            .copied()
            .collect();

        Ok(softmax(&logits))
    }
}

impl LocalLivenessDetector for FasnetDetector {
    fn create_inference_images(&self, image: &DynamicImage, roi: &Rect) -> Result<Vec<DynamicImage>> {
        create_inference_images(image, roi, &self.crop_specs())
    }

    fn local_score(&self, inference_images: &[DynamicImage]) -> Result<f32> {
        if inference_images.len() != self.models.len() {
            return Err(FusionSpoofError::Model(format!(
                "Expected {} FASNet inputs, got {}", self.models.len(), inference_images.len()
            )));
        }

        let mut live = 0.0f32;
        for (model, image) in self.models.iter().zip(inference_images) {
            let prediction = self.predict(model, image)?;
            live += prediction.get(LIVE_CLASS).copied().ok_or_else(|| {
                FusionSpoofError::Model(format!("FASNet output has {} classes", prediction.len()))
            })?;
        }

        let score = 1.0 - live / self.models.len() as f32;
        tracing::debug!("FASNet spoof score: {:.3}", score);
        Ok(score.clamp(0.0, 1.0))
    }
}

/// One crop per `FasnetCropSpec`, in order.
pub fn create_inference_images(image: &DynamicImage, roi: &Rect, specs: &[FasnetCropSpec]) -> Result<Vec<DynamicImage>> {
    specs
        .iter()
        .map(|spec| crop_inference_image(image, roi, spec))
        .collect()
}

pub fn crop_inference_image(image: &DynamicImage, roi: &Rect, spec: &FasnetCropSpec) -> Result<DynamicImage> {
    let (x, y, width, height) = crop_box(image.width(), image.height(), roi, spec.scale)
        .ok_or_else(|| FusionSpoofError::image_processing(format!(
            "crop face {:?} from {}x{} image", roi, image.width(), image.height()
        )))?;

    Ok(image
        .crop_imm(x, y, width, height)
        .resize_exact(spec.input_size, spec.input_size, FilterType::Triangle))
}

/// Box of `roi` enlarged by `scale` around its centre, shrunk if the image is
/// too small and shifted to stay inside it. Returns `(x, y, width, height)`.
pub(crate) fn crop_box(image_width: u32, image_height: u32, roi: &Rect, scale: f32) -> Option<(u32, u32, u32, u32)> {
    if !roi.is_valid() || image_width < 2 || image_height < 2 {
        return None;
    }

    let (src_w, src_h) = (image_width as f32, image_height as f32);
    if roi.x >= src_w || roi.y >= src_h || roi.max_x() <= 0.0 || roi.max_y() <= 0.0 {
        return None;
    }

    let scale = scale
        .min((src_h - 1.0) / roi.height)
        .min((src_w - 1.0) / roi.width);
    let new_width = roi.width * scale;
    let new_height = roi.height * scale;
    let (center_x, center_y) = roi.center();

    let mut left = center_x - new_width / 2.0;
    let mut top = center_y - new_height / 2.0;
    let mut right = center_x + new_width / 2.0;
    let mut bottom = center_y + new_height / 2.0;

    if left < 0.0 {
        right -= left;
        left = 0.0;
    }
    if top < 0.0 {
        bottom -= top;
        top = 0.0;
    }
    if right > src_w - 1.0 {
        left -= right - src_w + 1.0;
        right = src_w - 1.0;
    }
    if bottom > src_h - 1.0 {
        top -= bottom - src_h + 1.0;
        bottom = src_h - 1.0;
    }

    let (left, top) = (left.max(0.0) as u32, top.max(0.0) as u32);
    let (right, bottom) = (right as u32, bottom as u32);
    if right < left || bottom < top {
        return None;
    }

    Some((left, top, right - left + 1, bottom - top + 1))
}

fn optimization_level(level: u32) -> GraphOptimizationLevel {
    match level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    }
}

fn image_to_bgr_array(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let (width, height) = (rgb.width() as usize, rgb.height() as usize);
    let mut array = Array4::<f32>::zeros((1, 3, height, width));

    for (x, y, pixel) in rgb.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        array[[0, 0, y, x]] = pixel[2] as f32;
        array[[0, 1, y, x]] = pixel[1] as f32;
        array[[0, 2, y, x]] = pixel[0] as f32;
    }

    array
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}
