use moodcam_core::ClassifierOptions;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Runtime configuration: optional TOML file, then `MOODCAM_*` overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera index ("0") or V4L2 device path ("/dev/video0").
    pub camera_device: String,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// SCRFD model file name, relative to `model_dir`.
    pub detector_model: String,
    /// Emotion model file name, relative to `model_dir`.
    pub emotion_model: String,
    /// Minimum SCRFD face score.
    pub face_confidence: f32,
    /// Emotion model input and label settings (`[emotion]` table).
    pub emotion: ClassifierOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_device: "0".to_string(),
            model_dir: moodcam_core::default_model_dir(),
            detector_model: "det_10g.onnx".to_string(),
            emotion_model: "emotion.onnx".to_string(),
            face_confidence: moodcam_core::detector::DEFAULT_FACE_CONFIDENCE,
            emotion: ClassifierOptions::default(),
        }
    }
}

impl Config {
    /// Load from `explicit`, `$MOODCAM_CONFIG`, or the XDG config path,
    /// then apply environment overrides. A missing default file is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match explicit {
            Some(p) => (p.to_path_buf(), true),
            None => match std::env::var("MOODCAM_CONFIG") {
                Ok(p) => (PathBuf::from(p), true),
                Err(_) => (default_config_path(), false),
            },
        };

        let mut config = if required || path.exists() {
            let display = path.display().to_string();
            let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: display.clone(),
                source,
            })?;
            tracing::debug!(path = %display, "loaded config file");
            Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
                path: display,
                source,
            })?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `MOODCAM_*` overrides. Unparseable numbers are ignored.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(device) = var("MOODCAM_CAMERA_DEVICE") {
            self.camera_device = device;
        }
        if let Some(dir) = var("MOODCAM_MODEL_DIR") {
            self.model_dir = PathBuf::from(dir);
        }
        if let Some(conf) = var("MOODCAM_FACE_CONFIDENCE").and_then(|v| v.parse().ok()) {
            self.face_confidence = conf;
        }
        if let Some(pad) = var("MOODCAM_FACE_PADDING").and_then(|v| v.parse().ok()) {
            self.emotion.padding = pad;
        }
    }

    /// Device path for the configured camera; bare indices map to `/dev/videoN`.
    pub fn camera_path(&self) -> String {
        match self.camera_device.trim().parse::<usize>() {
            Ok(index) => moodcam_hw::camera::device_path_for_index(index),
            Err(_) => self.camera_device.clone(),
        }
    }

    /// Path to the SCRFD detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join(&self.detector_model)
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the emotion classification model.
    pub fn emotion_model_path(&self) -> String {
        self.model_dir
            .join(&self.emotion_model)
            .to_string_lossy()
            .into_owned()
    }
}

fn default_config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        })
        .join("moodcam")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use moodcam_core::{InputLayout, Normalization};
    use std::collections::HashMap;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.camera_device, "0");
        assert_eq!(config.camera_path(), "/dev/video0");
        assert_eq!(config.face_confidence, 0.5);
        assert_eq!(config.emotion.input_size, 64);
        assert!(config.detector_model_path().ends_with("det_10g.onnx"));
    }

    #[test]
    fn test_toml_overrides() {
        let config = Config::from_toml_str(
            r#"
            camera_device = "/dev/video4"
            model_dir = "/opt/models"
            emotion_model = "ferplus.onnx"

            [emotion]
            input_size = 48
            layout = "nchw"
            normalization = "unit"
            labels = ["neutral", "happiness", "surprise"]
            "#,
        )
        .unwrap();

        assert_eq!(config.camera_path(), "/dev/video4");
        assert_eq!(config.emotion_model_path(), "/opt/models/ferplus.onnx");
        assert_eq!(config.emotion.input_size, 48);
        assert_eq!(config.emotion.layout, InputLayout::Nchw);
        assert_eq!(config.emotion.normalization, Normalization::Unit);
        assert_eq!(config.emotion.labels, vec!["neutral", "happiness", "surprise"]);
        // Untouched fields keep their defaults.
        assert_eq!(config.emotion.padding, 10);
    }

    #[test]
    fn test_unknown_layout_rejected() {
        assert!(Config::from_toml_str("[emotion]\nlayout = \"chw\"").is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("MOODCAM_CAMERA_DEVICE", "2"),
            ("MOODCAM_MODEL_DIR", "/srv/models"),
            ("MOODCAM_FACE_CONFIDENCE", "0.7"),
            ("MOODCAM_FACE_PADDING", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.camera_path(), "/dev/video2");
        assert_eq!(config.model_dir, PathBuf::from("/srv/models"));
        assert_eq!(config.face_confidence, 0.7);
        assert_eq!(config.emotion.padding, 10);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = Config::load(Some(Path::new("/nonexistent/moodcam.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
