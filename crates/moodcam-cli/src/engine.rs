use moodcam_core::{BoundingBox, DetectorError, EmotionDetector, EmotionScores};
use moodcam_hw::{CameraError, FrameSource};
use std::fmt;
use thiserror::Error;

/// Display text of [`Outcome::CaptureError`].
pub const CAPTURE_ERROR_TEXT: &str = "Error capturing frame";
/// Display text of [`Outcome::NoFaceDetected`].
pub const NO_FACE_TEXT: &str = "No face detected";

/// Failures outside the two anticipated outcomes.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("camera error: {0}")]
    Camera(#[from] CameraError),
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("first face has no usable emotion scores ({scores} scores, none comparable)")]
    UnscoredFace { scores: usize },
}

/// The dominant emotion of the first detected face.
#[derive(Debug, Clone, PartialEq)]
pub struct DominantEmotion {
    pub label: String,
    pub score: f32,
    pub face: BoundingBox,
    /// All scores of that face, in label order.
    pub scores: EmotionScores,
}

/// Result of one capture-and-classify run.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Emotion(DominantEmotion),
    NoFaceDetected,
    CaptureError,
}

impl Outcome {
    pub fn label(&self) -> Option<&str> {
        match self {
            Outcome::Emotion(e) => Some(&e.label),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Emotion(e) => f.write_str(&e.label),
            Outcome::NoFaceDetected => f.write_str(NO_FACE_TEXT),
            Outcome::CaptureError => f.write_str(CAPTURE_ERROR_TEXT),
        }
    }
}

/// Open a frame source, read one frame, release the source, classify.
///
/// The source is dropped before classification starts, so the device is
/// released on every path. A failed read is the `CaptureError` outcome;
/// failing to open the source or to run the detector is an `EngineError`,
/// and so is a first face whose scores are empty or all NaN.
pub fn capture_and_classify<S, D, O>(open: O, detector: &mut D) -> Result<Outcome, EngineError>
where
    O: FnOnce() -> Result<S, CameraError>,
    S: FrameSource,
    D: EmotionDetector + ?Sized,
{
    let read = {
        let mut source = open()?;
        source.read_frame()
    };

    let frame = match read {
        Ok(frame) => frame,
        Err(err) => {
            tracing::warn!(error = %err, "frame capture failed");
            return Ok(Outcome::CaptureError);
        }
    };

    if frame.is_dark {
        tracing::warn!(
            brightness = frame.avg_brightness(),
            "captured frame is mostly dark; classifying anyway"
        );
    }

    let faces = detector.detect_emotions(&frame.data, frame.width, frame.height)?;
    tracing::info!(faces = faces.len(), seq = frame.sequence, "detection finished");
    drop(frame);

    // First face as returned by the detector; the rest are ignored.
    let Some(first) = faces.into_iter().next() else {
        return Ok(Outcome::NoFaceDetected);
    };

    let Some((label, score)) = first.emotions.dominant() else {
        let scores = first.emotions.len();
        tracing::error!(scores, "first face has no usable emotion scores");
        return Err(EngineError::UnscoredFace { scores });
    };
    let label = label.to_string();

    tracing::info!(emotion = %label, score, "dominant emotion");
    Ok(Outcome::Emotion(DominantEmotion {
        label,
        score,
        face: first.face,
        scores: first.emotions,
    }))
}
