use serde::{Deserialize, Serialize};

/// Label order of the FER mini-Xception emotion model.
pub const FER_LABELS: [&str; 7] = ["angry", "disgust", "fear", "happy", "sad", "surprise", "neutral"];

/// Bounding box for a detected face, in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection-over-Union with another box.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - inter;
        if union > 0.0 { inter / union } else { 0.0 }
    }
}

/// Per-face emotion scores, kept in the classifier's label order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores {
    entries: Vec<(String, f32)>,
}

impl EmotionScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (label, score) pairs; order is preserved.
    pub fn from_pairs<L: Into<String>>(pairs: impl IntoIterator<Item = (L, f32)>) -> Self {
        Self {
            entries: pairs.into_iter().map(|(l, s)| (l.into(), s)).collect(),
        }
    }

    pub fn get(&self, label: &str) -> Option<f32> {
        self.entries.iter().find(|(l, _)| l == label).map(|&(_, s)| s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), *s))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The label with the highest score.
    ///
    /// Ties go to the label seen first; a later label must be strictly
    /// greater to replace it. NaN scores are skipped.
    pub fn dominant(&self) -> Option<(&str, f32)> {
        let mut best: Option<(&str, f32)> = None;
        for (label, score) in self.iter() {
            if score.is_nan() {
                continue;
            }
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((label, score)),
            }
        }
        best
    }
}

/// One detected face and its emotion scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceEmotions {
    pub face: BoundingBox,
    pub emotions: EmotionScores,
}

/// Faces in the order the detector returned them. May be empty.
pub type DetectionResult = Vec<FaceEmotions>;
