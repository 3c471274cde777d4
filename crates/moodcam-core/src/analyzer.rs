//! Face detection plus per-face emotion scoring behind one seam.

use crate::classifier::{ClassifierOptions, EmotionClassifier};
use crate::detector::{DetectorError, FaceDetector};
use crate::types::{BoundingBox, DetectionResult, EmotionScores, FaceEmotions};

/// Anything that turns a grayscale frame into per-face emotion scores.
///
/// Faces come back in the implementation's own order; callers that only
/// want one face take the first.
pub trait EmotionDetector {
    fn detect_emotions(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<DetectionResult, DetectorError>;
}

/// Finds face boxes in a grayscale frame.
pub trait FaceLocator {
    fn locate(&mut self, frame: &[u8], width: u32, height: u32) -> Result<Vec<BoundingBox>, DetectorError>;
}

/// Scores one face box of a grayscale frame.
pub trait FaceScorer {
    fn score(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
        face: &BoundingBox,
    ) -> Result<EmotionScores, DetectorError>;
}

impl FaceLocator for FaceDetector {
    fn locate(&mut self, frame: &[u8], width: u32, height: u32) -> Result<Vec<BoundingBox>, DetectorError> {
        self.detect(frame, width, height)
    }
}

impl FaceScorer for EmotionClassifier {
    fn score(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
        face: &BoundingBox,
    ) -> Result<EmotionScores, DetectorError> {
        self.classify(frame, width, height, face)
    }
}

/// Located faces, each scored in the order the locator returned them.
///
/// Defaults to SCRFD plus the ONNX emotion classifier.
pub struct FaceEmotionAnalyzer<L = FaceDetector, S = EmotionClassifier> {
    locator: L,
    scorer: S,
}

impl<L: FaceLocator, S: FaceScorer> FaceEmotionAnalyzer<L, S> {
    pub fn new(locator: L, scorer: S) -> Self {
        Self { locator, scorer }
    }
}

impl FaceEmotionAnalyzer {
    /// Load both models.
    pub fn load(
        detector_path: &str,
        face_confidence: f32,
        emotion_path: &str,
        options: ClassifierOptions,
    ) -> Result<Self, DetectorError> {
        let detector = FaceDetector::load(detector_path, face_confidence)?;
        let classifier = EmotionClassifier::load(emotion_path, options)?;
        Ok(Self::new(detector, classifier))
    }
}

impl<L: FaceLocator, S: FaceScorer> EmotionDetector for FaceEmotionAnalyzer<L, S> {
    fn detect_emotions(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<DetectionResult, DetectorError> {
        let faces = self.locator.locate(frame, width, height)?;

        faces
            .into_iter()
            .map(|face| -> Result<FaceEmotions, DetectorError> {
                let emotions = self.scorer.score(frame, width, height, &face)?;
                tracing::debug!(
                    x = face.x,
                    y = face.y,
                    confidence = face.confidence,
                    dominant = ?emotions.dominant(),
                    "scored face"
                );
                Ok(FaceEmotions { face, emotions })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedFaces(Vec<BoundingBox>);

    impl FaceLocator for FixedFaces {
        fn locate(&mut self, _: &[u8], _: u32, _: u32) -> Result<Vec<BoundingBox>, DetectorError> {
            Ok(self.0.clone())
        }
    }

    /// Scores each face by its x position and records the call order.
    #[derive(Default)]
    struct RecordingScorer {
        seen: Vec<f32>,
        fail_at: Option<usize>,
    }

    impl FaceScorer for RecordingScorer {
        fn score(
            &mut self,
            _: &[u8],
            _: u32,
            _: u32,
            face: &BoundingBox,
        ) -> Result<EmotionScores, DetectorError> {
            if self.fail_at == Some(self.seen.len()) {
                return Err(DetectorError::InferenceFailed("scorer failed".into()));
            }
            self.seen.push(face.x);
            Ok(EmotionScores::from_pairs([("happy", face.x / 100.0)]))
        }
    }

    fn bbox(x: f32, confidence: f32) -> BoundingBox {
        BoundingBox { x, y: 0.0, width: 10.0, height: 10.0, confidence }
    }

    #[test]
    fn test_every_face_scored_in_locator_order() {
        // Locator order is kept even when it is not sorted by confidence.
        let faces = vec![bbox(30.0, 0.6), bbox(10.0, 0.9), bbox(20.0, 0.7)];
        let mut analyzer = FaceEmotionAnalyzer::new(FixedFaces(faces), RecordingScorer::default());

        let result = analyzer.detect_emotions(&[0; 4], 2, 2).unwrap();

        assert_eq!(analyzer.scorer.seen, vec![30.0, 10.0, 20.0]);
        let xs: Vec<f32> = result.iter().map(|f| f.face.x).collect();
        assert_eq!(xs, vec![30.0, 10.0, 20.0]);
        assert_eq!(result[1].emotions.get("happy"), Some(0.1));
    }

    #[test]
    fn test_no_faces_means_no_scoring() {
        let mut analyzer = FaceEmotionAnalyzer::new(FixedFaces(vec![]), RecordingScorer::default());
        let result = analyzer.detect_emotions(&[0; 4], 2, 2).unwrap();
        assert!(result.is_empty());
        assert!(analyzer.scorer.seen.is_empty());
    }

    #[test]
    fn test_scorer_failure_stops_the_run() {
        let scorer = RecordingScorer { fail_at: Some(1), ..Default::default() };
        let mut analyzer =
            FaceEmotionAnalyzer::new(FixedFaces(vec![bbox(1.0, 0.9), bbox(2.0, 0.8), bbox(3.0, 0.7)]), scorer);

        let result = analyzer.detect_emotions(&[0; 4], 2, 2);

        assert!(matches!(result, Err(DetectorError::InferenceFailed(_))));
        assert_eq!(analyzer.scorer.seen, vec![1.0]);
    }

    #[test]
    fn test_load_reports_missing_detector_first() {
        let result = FaceEmotionAnalyzer::load(
            "/nonexistent/det_10g.onnx",
            0.5,
            "/nonexistent/emotion.onnx",
            ClassifierOptions::default(),
        );
        match result {
            Err(DetectorError::ModelNotFound(path)) => assert!(path.ends_with("det_10g.onnx")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("models should not load"),
        }
    }
}
