//! Emotion classifier via ONNX Runtime.
//!
//! Crops a detected face (plus a pixel margin) out of the grayscale frame,
//! resizes it to the model's square input and maps the output vector onto
//! the configured labels, in order.

use crate::detector::DetectorError;
use crate::types::{BoundingBox, EmotionScores, FER_LABELS};
use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use serde::Deserialize;
use std::path::Path;

/// Tolerance when deciding whether the model already outputs probabilities.
const PROBABILITY_SUM_TOLERANCE: f32 = 1e-3;

/// Tensor layout of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputLayout {
    /// `[1, size, size, 1]`, as exported from Keras (FER mini-Xception).
    #[default]
    Nhwc,
    /// `[1, 1, size, size]` (FER+).
    Nchw,
}

/// Pixel normalization applied before inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Normalization {
    /// x / 255 * 2 - 1, range [-1, 1].
    #[default]
    Signed,
    /// x / 255, range [0, 1].
    Unit,
}

impl Normalization {
    fn apply(self, pixel: u8) -> f32 {
        let v = pixel as f32;
        match self {
            Self::Signed => v / 255.0 * 2.0 - 1.0,
            Self::Unit => v / 255.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClassifierOptions {
    /// Side length of the square model input.
    pub input_size: u32,
    pub layout: InputLayout,
    pub normalization: Normalization,
    /// Output labels, in the model's output order.
    pub labels: Vec<String>,
    /// Pixels added on every side of the face box before cropping.
    pub padding: u32,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            input_size: 64,
            layout: InputLayout::default(),
            normalization: Normalization::default(),
            labels: FER_LABELS.iter().map(|l| l.to_string()).collect(),
            padding: 10,
        }
    }
}

/// Face-crop emotion classifier.
pub struct EmotionClassifier {
    session: Session,
    options: ClassifierOptions,
}

impl EmotionClassifier {
    /// Load the emotion ONNX model from the given path.
    pub fn load(model_path: &str, options: ClassifierOptions) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }
        if options.labels.is_empty() || options.input_size == 0 {
            return Err(DetectorError::InferenceFailed(
                "emotion classifier needs at least one label and a non-zero input size".into(),
            ));
        }

        let session = Session::builder()?
            .with_intra_threads(1)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            input_size = options.input_size,
            layout = ?options.layout,
            labels = ?options.labels,
            "loaded emotion model"
        );

        Ok(Self { session, options })
    }

    /// Score one face of a grayscale frame.
    pub fn classify(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
        face: &BoundingBox,
    ) -> Result<EmotionScores, DetectorError> {
        let crop = crop_face(frame, width, height, face, self.options.padding)?;
        let input = preprocess(&crop, &self.options);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("emotion scores: {e}")))?;

        scores_for_labels(raw, &self.options.labels)
    }
}

/// Cut the padded face box out of the frame, clamped to its bounds.
fn crop_face(
    frame: &[u8],
    width: u32,
    height: u32,
    face: &BoundingBox,
    padding: u32,
) -> Result<GrayImage, DetectorError> {
    let pixels = width as usize * height as usize;
    let gray = frame
        .get(..pixels)
        .and_then(|p| GrayImage::from_raw(width, height, p.to_vec()))
        .ok_or_else(|| {
            DetectorError::InvalidFrame(format!("{} bytes for {width}x{height}", frame.len()))
        })?;

    let pad = padding as f32;
    let x0 = (face.x - pad).floor().clamp(0.0, width as f32) as u32;
    let y0 = (face.y - pad).floor().clamp(0.0, height as f32) as u32;
    let x1 = (face.x + face.width + pad).ceil().clamp(0.0, width as f32) as u32;
    let y1 = (face.y + face.height + pad).ceil().clamp(0.0, height as f32) as u32;

    if x1 <= x0 || y1 <= y0 {
        return Err(DetectorError::InvalidFrame(format!(
            "face box ({}, {}, {}x{}) lies outside the {width}x{height} frame",
            face.x, face.y, face.width, face.height
        )));
    }

    Ok(imageops::crop_imm(&gray, x0, y0, x1 - x0, y1 - y0).to_image())
}

/// Resize the crop to the model input and lay it out as a float tensor.
fn preprocess(crop: &GrayImage, options: &ClassifierOptions) -> Array4<f32> {
    let size = options.input_size;
    let resized = imageops::resize(crop, size, size, FilterType::Triangle);

    let side = size as usize;
    let shape = match options.layout {
        InputLayout::Nhwc => (1, side, side, 1),
        InputLayout::Nchw => (1, 1, side, side),
    };
    let mut tensor = Array4::<f32>::zeros(shape);
    for (x, y, px) in resized.enumerate_pixels() {
        let v = options.normalization.apply(px.0[0]);
        let (x, y) = (x as usize, y as usize);
        match options.layout {
            InputLayout::Nhwc => tensor[[0, y, x, 0]] = v,
            InputLayout::Nchw => tensor[[0, 0, y, x]] = v,
        }
    }
    tensor
}

/// Pair model outputs with labels, applying softmax to raw logits.
fn scores_for_labels(raw: &[f32], labels: &[String]) -> Result<EmotionScores, DetectorError> {
    if raw.len() != labels.len() {
        return Err(DetectorError::LabelMismatch {
            expected: labels.len(),
            actual: raw.len(),
        });
    }

    let is_distribution = raw.iter().all(|v| (0.0..=1.0).contains(v))
        && (raw.iter().sum::<f32>() - 1.0).abs() < PROBABILITY_SUM_TOLERANCE;
    let probs = if is_distribution { raw.to_vec() } else { softmax(raw) };

    Ok(EmotionScores::from_pairs(labels.iter().cloned().zip(probs)))
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
