//! File/code adapted from https://github.com/jamjamjon/usls
//!
//! Detector and pipeline options.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::common::InferenceDevice;
use crate::data::FsAccess;
use crate::detection_ranker::RankThresholds;
use crate::detection_runners::InferenceParams;
use crate::error::{DetectError, Result};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectorConfig {
    pub model_path: PathBuf,
    #[serde(default)]
    pub ort_lib_path: Option<PathBuf>,
    #[serde(default)]
    pub labels_path: Option<PathBuf>,
    #[serde(default)]
    pub class_names: Option<Vec<String>>,
    #[serde(default)]
    pub inference_device: InferenceDevice,
    #[serde(default)]
    pub device_id: i32,
    #[serde(default = "default_model_size")]
    pub model_width: u32,
    #[serde(default = "default_model_size")]
    pub model_height: u32,
    #[serde(default = "default_target_height")]
    pub target_height: u32,
    #[serde(default = "default_iou_threshold")]
    pub iou_threshold: f32,
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default = "default_smoke_confidence")]
    pub smoke_confidence: f32,
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    #[serde(default = "default_label_font_px")]
    pub label_font_px: f32,
    #[serde(default)]
    pub profile: bool,
}

fn default_model_size() -> u32 { 640 }
fn default_target_height() -> u32 { 640 }
fn default_iou_threshold() -> f32 { 0.2 }
fn default_min_confidence() -> f32 { 0.5 }
fn default_smoke_confidence() -> f32 { 0.75 }
fn default_label_font_px() -> f32 { 32.0 }

impl DetectorConfig {
    pub fn new<P: AsRef<Path>>(model_path: P) -> Self {
        Self {
            model_path: model_path.as_ref().to_path_buf(),
            ort_lib_path: None,
            labels_path: None,
            class_names: None,
            inference_device: InferenceDevice::default(),
            device_id: 0,
            model_width: default_model_size(),
            model_height: default_model_size(),
            target_height: default_target_height(),
            iou_threshold: default_iou_threshold(),
            min_confidence: default_min_confidence(),
            smoke_confidence: default_smoke_confidence(),
            font_path: None,
            label_font_px: default_label_font_px(),
            profile: false,
        }
    }

    /// `<config dir>/fire_detect/config.json`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(FsAccess::Config.app_path()?.join(CONFIG_FILE))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DetectError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Self::from_json(&text)
            .map_err(|e| DetectError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).map_err(|e| DetectError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_path.as_os_str().is_empty() {
            return Err(DetectError::Config("model_path is empty".to_string()));
        }
        for (name, value) in [
            ("iou_threshold", self.iou_threshold),
            ("min_confidence", self.min_confidence),
            ("smoke_confidence", self.smoke_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DetectError::Config(format!("{name} must be within [0, 1], got {value}")));
            }
        }
        if self.model_width == 0 || self.model_height == 0 || self.target_height == 0 {
            return Err(DetectError::Config(format!(
                "Sizes must be non-zero (model {}x{}, target height {})",
                self.model_width, self.model_height, self.target_height
            )));
        }
        if self.label_font_px.is_nan() || self.label_font_px <= 0. {
            return Err(DetectError::Config(format!("label_font_px must be positive, got {}", self.label_font_px)));
        }
        if self.smoke_confidence < self.min_confidence {
            log::warn!(
                "smoke_confidence ({}) is lower than min_confidence ({}); detections below min_confidence are already filtered by the model",
                self.smoke_confidence,
                self.min_confidence
            );
        }
        Ok(())
    }

    pub fn with_device(mut self, device: InferenceDevice) -> Self {
        self.inference_device = device;
        self
    }

    pub fn with_target_height(mut self, target_height: u32) -> Self {
        self.target_height = target_height;
        self
    }

    pub fn with_iou(mut self, iou: f32) -> Self {
        self.iou_threshold = iou;
        self
    }

    pub fn with_min_confidence(mut self, conf: f32) -> Self {
        self.min_confidence = conf;
        self
    }

    pub fn with_smoke_confidence(mut self, conf: f32) -> Self {
        self.smoke_confidence = conf;
        self
    }

    pub fn with_profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    pub fn rank_thresholds(&self) -> RankThresholds {
        RankThresholds::new(self.min_confidence, self.smoke_confidence)
    }

    pub fn inference_params(&self) -> InferenceParams {
        InferenceParams::new(self.iou_threshold, self.min_confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn minimal_json_gets_defaults() {
        let config = DetectorConfig::from_json(r#"{ "model_path": "models/fire.onnx" }"#).unwrap();
        assert_eq!(config, DetectorConfig::new("models/fire.onnx"));
        assert_eq!(config.target_height, 640);
        assert_eq!(config.iou_threshold, 0.2);
        assert_eq!(config.rank_thresholds(), RankThresholds::new(0.5, 0.75));
        assert_eq!(config.inference_device, InferenceDevice::CPU);
    }

    #[test]
    fn full_json() {
        let json = r#"{
            "model_path": "fire.onnx",
            "ort_lib_path": "/opt/onnxruntime/lib/libonnxruntime.so",
            "class_names": ["Fire", "Smoke"],
            "inference_device": "cuda",
            "device_id": 1,
            "target_height": 480,
            "iou_threshold": 0.45,
            "min_confidence": 0.4,
            "smoke_confidence": 0.8,
            "profile": true
        }"#;
        let config = DetectorConfig::from_json(json).unwrap();
        assert_eq!(config.inference_device, InferenceDevice::CUDA);
        assert_eq!(config.device_id, 1);
        assert_eq!(config.class_names.as_deref(), Some(&["Fire".to_string(), "Smoke".to_string()][..]));
        assert_eq!(config.inference_params(), InferenceParams::new(0.45, 0.4));
        assert!(config.profile);
    }

    #[test]
    fn missing_model_path_is_rejected() {
        assert!(matches!(DetectorConfig::from_json("{}"), Err(DetectError::Config(_))));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = DetectorConfig::from_json(r#"{ "model_path": "a.onnx", "iou": 0.3 }"#).unwrap_err();
        assert!(err.to_string().contains("iou"));
    }

    #[test]
    fn out_of_range_thresholds() {
        assert!(DetectorConfig::new("a.onnx").with_iou(1.5).validate().is_err());
        assert!(DetectorConfig::new("a.onnx").with_min_confidence(-0.1).validate().is_err());
        assert!(DetectorConfig::new("a.onnx").with_target_height(0).validate().is_err());
        // lower smoke threshold is only a warning
        assert!(DetectorConfig::new("a.onnx").with_smoke_confidence(0.3).validate().is_ok());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "model_path": "x.onnx", "smoke_confidence": 0.9 }}"#).unwrap();
        let config = DetectorConfig::load(file.path()).unwrap();
        assert_eq!(config.smoke_confidence, 0.9);

        assert!(matches!(DetectorConfig::load("/nonexistent/config.json"), Err(DetectError::Config(_))));
    }

    #[test]
    fn default_path_under_app_dir() {
        let path = DetectorConfig::default_path().unwrap();
        assert!(path.ends_with("fire_detect/config.json"));
    }
}
