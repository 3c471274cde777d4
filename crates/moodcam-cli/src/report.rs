//! JSON report for `--json` output.

use crate::engine::Outcome;
use chrono::{DateTime, Utc};
use moodcam_core::BoundingBox;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    /// `emotion`, `no_face`, or `capture_error`.
    pub outcome: &'static str,
    /// Plain-text rendering, identical to the non-JSON output.
    pub text: String,
    pub label: Option<&'a str>,
    pub score: Option<f32>,
    /// Every score of the first face, in label order.
    pub scores: Vec<LabelScore<'a>>,
    pub face: Option<&'a BoundingBox>,
    /// Device path or image file the frame came from.
    pub source: &'a str,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LabelScore<'a> {
    pub label: &'a str,
    pub score: f32,
}

impl<'a> Report<'a> {
    pub fn new(outcome: &'a Outcome, source: &'a str, captured_at: DateTime<Utc>) -> Self {
        let text = outcome.to_string();
        match outcome {
            Outcome::Emotion(e) => Self {
                outcome: "emotion",
                text,
                label: outcome.label(),
                score: Some(e.score),
                scores: e
                    .scores
                    .iter()
                    .map(|(label, score)| LabelScore { label, score })
                    .collect(),
                face: Some(&e.face),
                source,
                captured_at,
            },
            Outcome::NoFaceDetected | Outcome::CaptureError => Self {
                outcome: if matches!(outcome, Outcome::NoFaceDetected) {
                    "no_face"
                } else {
                    "capture_error"
                },
                text,
                label: None,
                score: None,
                scores: Vec::new(),
                face: None,
                source,
                captured_at,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::DominantEmotion;
    use moodcam_core::EmotionScores;

    fn at() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-18T09:30:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_emotion_report() {
        let outcome = Outcome::Emotion(DominantEmotion {
            label: "happy".into(),
            score: 0.75,
            face: BoundingBox { x: 1.0, y: 2.0, width: 3.0, height: 4.0, confidence: 0.5 },
            scores: EmotionScores::from_pairs([("sad", 0.25), ("happy", 0.75)]),
        });
        let json = serde_json::to_value(Report::new(&outcome, "/dev/video0", at())).unwrap();

        assert_eq!(json["outcome"], "emotion");
        assert_eq!(json["text"], "happy");
        assert_eq!(json["label"], "happy");
        assert_eq!(json["score"], 0.75);
        assert_eq!(json["scores"][0]["label"], "sad");
        assert_eq!(json["scores"][1]["score"], 0.75);
        assert_eq!(json["face"]["width"], 3.0);
        assert_eq!(json["source"], "/dev/video0");
        assert_eq!(json["captured_at"], "2026-10-18T09:30:00Z");
    }

    #[test]
    fn test_sentinel_reports() {
        let no_face = serde_json::to_value(Report::new(&Outcome::NoFaceDetected, "x", at())).unwrap();
        assert_eq!(no_face["outcome"], "no_face");
        assert_eq!(no_face["text"], "No face detected");
        assert!(no_face["label"].is_null());
        assert_eq!(no_face["scores"].as_array().unwrap().len(), 0);

        let failed = serde_json::to_value(Report::new(&Outcome::CaptureError, "x", at())).unwrap();
        assert_eq!(failed["outcome"], "capture_error");
        assert_eq!(failed["text"], "Error capturing frame");
    }
}
