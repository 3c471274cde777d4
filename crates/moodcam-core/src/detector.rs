//! SCRFD face detector via ONNX Runtime.
//!
//! Letterboxes the frame to the model's square input, decodes the three
//! anchor-free stride heads, and suppresses overlapping boxes.

use crate::types::BoundingBox;
use image::imageops::{self, FilterType};
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const SCRFD_INPUT_SIZE: u32 = 640;
const SCRFD_MEAN: f32 = 127.5;
const SCRFD_STD: f32 = 128.0;
const SCRFD_NMS_THRESHOLD: f32 = 0.4;
const SCRFD_STRIDES: [u32; 3] = [8, 16, 32];
const SCRFD_ANCHORS_PER_CELL: usize = 2;

/// Default minimum face score.
pub const DEFAULT_FACE_CONFIDENCE: f32 = 0.5;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("model returns {actual} scores but {expected} labels are configured")]
    LabelMismatch { expected: usize, actual: usize },
    #[error("invalid frame: {0}")]
    InvalidFrame(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Scale and padding applied when fitting the frame into the model input.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn fit(width: u32, height: u32, target: u32) -> (Self, u32, u32) {
        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).clamp(1, target);
        let new_h = ((height as f32 * scale).round() as u32).clamp(1, target);
        let letterbox = Self {
            scale,
            pad_x: ((target - new_w) / 2) as f32,
            pad_y: ((target - new_h) / 2) as f32,
        };
        (letterbox, new_w, new_h)
    }

    /// Map a point from model input space back to the frame.
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Output tensor indices (score, bbox) for one stride.
type StrideOutputs = (usize, usize);

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    confidence: f32,
    /// Indexed like `SCRFD_STRIDES`.
    stride_outputs: [StrideOutputs; 3],
}

impl FaceDetector {
    /// Load the SCRFD ONNX model. Faces scoring at or below `confidence` are dropped.
    pub fn load(model_path: &str, confidence: f32) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();

        tracing::info!(
            path = model_path,
            outputs = ?output_names,
            confidence,
            "loaded SCRFD model"
        );

        // 6 outputs without keypoints, 9 with; keypoints are not used.
        if output_names.len() < 6 {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model needs score and bbox outputs for 3 strides, got {} outputs",
                output_names.len()
            )));
        }

        let stride_outputs = map_stride_outputs(&output_names);
        tracing::debug!(?stride_outputs, "SCRFD output mapping");

        Ok(Self {
            session,
            confidence,
            stride_outputs,
        })
    }

    /// Detect faces in a grayscale frame, highest confidence first.
    pub fn detect(
        &mut self,
        frame: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<BoundingBox>, DetectorError> {
        let (input, letterbox) = letterbox_tensor(frame, width, height, SCRFD_INPUT_SIZE)?;

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (&stride, &(score_idx, bbox_idx)) in SCRFD_STRIDES.iter().zip(&self.stride_outputs) {
            let (_, scores) = outputs[score_idx].try_extract_tensor::<f32>().map_err(|e| {
                DetectorError::InferenceFailed(format!("scores stride {stride}: {e}"))
            })?;
            let (_, deltas) = outputs[bbox_idx].try_extract_tensor::<f32>().map_err(|e| {
                DetectorError::InferenceFailed(format!("bboxes stride {stride}: {e}"))
            })?;

            candidates.extend(decode_stride(
                scores,
                deltas,
                stride,
                SCRFD_INPUT_SIZE,
                &letterbox,
                self.confidence,
            ));
        }

        let faces = nms(candidates, SCRFD_NMS_THRESHOLD);
        tracing::debug!(count = faces.len(), "SCRFD faces");
        Ok(faces)
    }
}

/// Resize the frame into a `target`×`target` NCHW tensor, padding with the
/// mean so the border normalizes to zero.
fn letterbox_tensor(
    frame: &[u8],
    width: u32,
    height: u32,
    target: u32,
) -> Result<(Array4<f32>, Letterbox), DetectorError> {
    if width == 0 || height == 0 {
        return Err(DetectorError::InvalidFrame(format!("{width}x{height}")));
    }
    let pixels = width as usize * height as usize;
    let gray = frame
        .get(..pixels)
        .and_then(|p| GrayImage::from_raw(width, height, p.to_vec()))
        .ok_or_else(|| {
            DetectorError::InvalidFrame(format!(
                "{} bytes for {width}x{height}",
                frame.len()
            ))
        })?;

    let (letterbox, new_w, new_h) = Letterbox::fit(width, height, target);
    let resized = imageops::resize(&gray, new_w, new_h, FilterType::Triangle);

    let side = target as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    let (ox, oy) = (letterbox.pad_x as u32, letterbox.pad_y as u32);
    for (x, y, px) in resized.enumerate_pixels() {
        let v = (px.0[0] as f32 - SCRFD_MEAN) / SCRFD_STD;
        let (tx, ty) = ((x + ox) as usize, (y + oy) as usize);
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = v;
        }
    }

    Ok((tensor, letterbox))
}

/// Map stride heads to output tensors by name ("score_8", "bbox_32", ...),
/// falling back to the export's positional order: scores 0–2, bboxes 3–5.
fn map_stride_outputs(names: &[String]) -> [StrideOutputs; 3] {
    let find = |prefix: &str, stride: u32| {
        let target = format!("{prefix}_{stride}");
        names.iter().position(|n| *n == target)
    };

    let named: Option<Vec<StrideOutputs>> = SCRFD_STRIDES
        .iter()
        .map(|&s| Some((find("score", s)?, find("bbox", s)?)))
        .collect();

    match named {
        Some(found) => [found[0], found[1], found[2]],
        None => {
            tracing::info!(?names, "SCRFD output names not recognized, using positional mapping");
            [(0, 3), (1, 4), (2, 5)]
        }
    }
}

/// Decode one stride head into frame-space boxes above `threshold`.
fn decode_stride(
    scores: &[f32],
    deltas: &[f32],
    stride: u32,
    input_size: u32,
    letterbox: &Letterbox,
    threshold: f32,
) -> Vec<BoundingBox> {
    let grid = (input_size / stride) as usize;
    let step = stride as f32;
    let anchors = grid * grid * SCRFD_ANCHORS_PER_CELL;

    scores
        .iter()
        .take(anchors)
        .enumerate()
        .filter(|&(_, &score)| score > threshold)
        .filter_map(|(idx, &score)| {
            let d = deltas.get(idx * 4..idx * 4 + 4)?;
            let cell = idx / SCRFD_ANCHORS_PER_CELL;
            let cx = (cell % grid) as f32 * step;
            let cy = (cell / grid) as f32 * step;

            let (x1, y1) = letterbox.unmap(cx - d[0] * step, cy - d[1] * step);
            let (x2, y2) = letterbox.unmap(cx + d[2] * step, cy + d[3] * step);
            Some(BoundingBox {
                x: x1,
                y: y1,
                width: x2 - x1,
                height: y2 - y1,
                confidence: score,
            })
        })
        .collect()
}

/// Greedy non-maximum suppression. Output is sorted by descending confidence.
fn nms(mut boxes: Vec<BoundingBox>, iou_threshold: f32) -> Vec<BoundingBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<BoundingBox> = Vec::with_capacity(boxes.len());
    for candidate in boxes {
        if keep.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}
