use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use crate::common::error::{FusionSpoofError, Result};

const DEFAULT_CONFIG_PATH: &str = "configs/fusion-spoof.toml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub fasnet: FasnetConfig,
    #[serde(default)]
    pub spoof_device: SpoofDeviceConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_confidence_threshold() -> f32 { 0.5 }
fn default_timeout() -> u64 { 30 }

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FasnetConfig {
    #[serde(default = "default_fasnet_models")]
    pub models: Vec<FasnetModelConfig>,
    #[serde(default = "default_optimization_level")]
    pub optimization_level: u32,
}

impl Default for FasnetConfig {
    fn default() -> Self {
        Self {
            models: default_fasnet_models(),
            optimization_level: default_optimization_level(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FasnetModelConfig {
    pub path: PathBuf,
    pub scale: f32,
    #[serde(default = "default_fasnet_input_size")]
    pub input_size: u32,
}

fn default_fasnet_models() -> Vec<FasnetModelConfig> {
    vec![
        FasnetModelConfig {
            path: PathBuf::from("models/2.7_80x80_MiniFASNetV2.onnx"),
            scale: 2.7,
            input_size: default_fasnet_input_size(),
        },
        FasnetModelConfig {
            path: PathBuf::from("models/4_0_0_80x80_MiniFASNetV1SE.onnx"),
            scale: 4.0,
            input_size: default_fasnet_input_size(),
        },
    ]
}

fn default_fasnet_input_size() -> u32 { 80 }
fn default_optimization_level() -> u32 { 3 }

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpoofDeviceConfig {
    #[serde(default = "default_working_frame_size")]
    pub working_frame_size: u32,
}

impl Default for SpoofDeviceConfig {
    fn default() -> Self {
        Self { working_frame_size: default_working_frame_size() }
    }
}

fn default_working_frame_size() -> u32 { 640 }

impl Config {
    /// Loads the config from `configs/fusion-spoof.toml`, falling back to the
    /// platform config directory.
    pub fn load() -> Result<Self> {
        let local = PathBuf::from(DEFAULT_CONFIG_PATH);
        if local.exists() {
            return Self::load_from_path(&local);
        }

        let dirs = ProjectDirs::from("com", "fusionspoof", "FusionSpoof")
            .ok_or_else(|| FusionSpoofError::Config("Failed to get project dirs".into()))?;
        Self::load_from_path(&dirs.config_dir().join("fusion-spoof.toml"))
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FusionSpoofError::Config(format!(
                "Config file not found: {}. Please create it from the example.", path.display()
            )));
        }

        tracing::info!("Loading config from: {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;

        // Model paths are relative to the config file
        if let Some(base) = path.parent() {
            config.resolve_model_paths(base);
        }

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| FusionSpoofError::Config(format!("Config parse error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn resolve_model_paths(&mut self, base: &Path) {
        for model in &mut self.fasnet.models {
            if model.path.is_relative() {
                model.path = base.join(&model.path);
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.service.url.trim().is_empty() {
            return Err(FusionSpoofError::Config("Service URL must not be empty".into()));
        }
        reqwest::Url::parse(&self.service.url).map_err(|e| FusionSpoofError::Config(format!(
            "Invalid service URL {}: {}", self.service.url, e
        )))?;

        if self.service.api_key.trim().is_empty() {
            return Err(FusionSpoofError::Config("API key must not be empty".into()));
        }

        if !(0.0..=1.0).contains(&self.service.confidence_threshold) {
            return Err(FusionSpoofError::Config(format!(
                "Confidence threshold must be between 0.0 and 1.0, got {}",
                self.service.confidence_threshold
            )));
        }

        if self.service.timeout_seconds < 1 || self.service.timeout_seconds > 300 {
            return Err(FusionSpoofError::Config(format!(
                "Timeout must be between 1 and 300 seconds, got {}",
                self.service.timeout_seconds
            )));
        }

        if self.fasnet.models.is_empty() {
            return Err(FusionSpoofError::Config("At least one FASNet model is required".into()));
        }
        for model in &self.fasnet.models {
            if !model.scale.is_finite() || model.scale <= 0.0 {
                return Err(FusionSpoofError::Config(format!(
                    "FASNet crop scale must be positive, got {} for {}",
                    model.scale, model.path.display()
                )));
            }
            if model.input_size == 0 || model.input_size > 1024 {
                return Err(FusionSpoofError::Config(format!(
                    "FASNet input size must be between 1 and 1024, got {}", model.input_size
                )));
            }
        }

        if self.spoof_device.working_frame_size == 0 || self.spoof_device.working_frame_size > 4096 {
            return Err(FusionSpoofError::Config(format!(
                "Working frame size must be between 1 and 4096, got {}",
                self.spoof_device.working_frame_size
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [service]
        url = "https://spoof.example.com/fusion"
        api_key = "secret"
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.service.confidence_threshold, 0.5);
        assert_eq!(config.service.timeout_seconds, 30);
        assert_eq!(config.spoof_device.working_frame_size, 640);
        assert_eq!(config.fasnet.models.len(), 2);
        assert_eq!(config.fasnet.models[0].scale, 2.7);
        assert_eq!(config.fasnet.models[1].input_size, 80);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let toml = r#"
            [service]
            url = "https://spoof.example.com/fusion"
            api_key = "secret"
            confidence_threshold = 1.5
        "#;
        assert!(matches!(Config::from_toml_str(toml), Err(FusionSpoofError::Config(_))));
    }

    #[test]
    fn rejects_invalid_url() {
        let toml = r#"
            [service]
            url = "not a url"
            api_key = "secret"
        "#;
        assert!(matches!(Config::from_toml_str(toml), Err(FusionSpoofError::Config(_))));
    }

    #[test]
    fn rejects_zero_working_frame() {
        let toml = r#"
            [service]
            url = "https://spoof.example.com/fusion"
            api_key = "secret"

            [spoof_device]
            working_frame_size = 0
        "#;
        assert!(Config::from_toml_str(toml).is_err());
    }

    #[test]
    fn resolves_relative_model_paths() {
        let mut config = Config::from_toml_str(MINIMAL).unwrap();
        config.resolve_model_paths(Path::new("/etc/fusion-spoof"));
        assert_eq!(
            config.fasnet.models[0].path,
            PathBuf::from("/etc/fusion-spoof/models/2.7_80x80_MiniFASNetV2.onnx")
        );
    }
}
