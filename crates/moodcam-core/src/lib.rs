//! moodcam-core: face detection and emotion classification.
//!
//! SCRFD finds faces, a FER-style CNN scores each face crop against a fixed
//! label set. Both run on ONNX Runtime on the CPU.

pub mod analyzer;
pub mod classifier;
pub mod detector;
pub mod types;

pub use analyzer::{EmotionDetector, FaceEmotionAnalyzer, FaceLocator, FaceScorer};
pub use classifier::{ClassifierOptions, EmotionClassifier, InputLayout, Normalization};
pub use detector::{DetectorError, FaceDetector};
pub use types::{BoundingBox, DetectionResult, EmotionScores, FaceEmotions, FER_LABELS};

use std::path::PathBuf;

/// Default directory holding `det_10g.onnx` and `emotion.onnx`.
///
/// `$XDG_DATA_HOME/moodcam/models`, falling back to `~/.local/share`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("moodcam")
        .join("models")
}
