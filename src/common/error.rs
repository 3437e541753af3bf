use thiserror::Error;

#[derive(Error, Debug)]
pub enum FusionSpoofError {
    #[error("Network request to {url} failed")]
    NetworkRequestFailed { url: String },

    #[error("Image processing failed: {0}")]
    ImageProcessingFailed(String),

    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ORT error: {0}")]
    Ort(#[from] ort::OrtError),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl FusionSpoofError {
    pub(crate) fn image_processing(operation: impl Into<String>) -> Self {
        FusionSpoofError::ImageProcessingFailed(operation.into())
    }
}

pub type Result<T> = std::result::Result<T, FusionSpoofError>;
