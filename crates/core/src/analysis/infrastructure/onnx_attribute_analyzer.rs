/// Face detection plus age/gender estimation using ONNX Runtime via `ort`.
///
/// Two sessions: a YOLO-style face detector (letterbox preprocessing,
/// confidence filter, greedy NMS) and a per-face attribute head that
/// emits `[female, male, age/100]`.
use std::collections::HashMap;
use std::path::Path;

use crate::analysis::domain::face_analyzer::{AnalyzeError, FaceAnalyzer};
use crate::analysis::domain::observation::{AnalysisResult, FaceObservation};
use crate::shared::frame::Frame;
use crate::shared::region::FaceRegion;

/// Fallback detector input resolution when the model doesn't specify
/// dimensions.
const DEFAULT_DETECT_INPUT: u32 = 640;

/// Fallback attribute-head input resolution.
const DEFAULT_ATTR_INPUT: u32 = 96;

/// Default confidence threshold for face detection.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Attribute-head gender output order.
const GENDER_LABELS: [&str; 2] = ["Woman", "Man"];

/// Oldest age the attribute head is allowed to claim.
const MAX_AGE: u32 = 120;

pub struct OnnxAttributeAnalyzer {
    detect_session: ort::session::Session,
    attr_session: ort::session::Session,
    confidence: f64,
    detect_input: u32,
    attr_input: u32,
}

impl OnnxAttributeAnalyzer {
    /// Load both ONNX models and prepare for inference.
    ///
    /// Input resolutions are read from each model's input shape (expecting
    /// NCHW), falling back to 640 (detector) and 96 (attribute head) when
    /// the shape is dynamic or unreadable.
    pub fn new(
        detect_model: &Path,
        attr_model: &Path,
        confidence: f64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let detect_session = build_session(detect_model)?;
        let attr_session = build_session(attr_model)?;
        let detect_input = tensor_input_size(&detect_session).unwrap_or(DEFAULT_DETECT_INPUT);
        let attr_input = tensor_input_size(&attr_session).unwrap_or(DEFAULT_ATTR_INPUT);

        Ok(Self {
            detect_session,
            attr_session,
            confidence,
            detect_input,
            attr_input,
        })
    }

    fn detect_faces(&mut self, frame: &Frame) -> Result<Vec<FaceRegion>, AnalyzeError> {
        let (input, scale, pad_x, pad_y) = letterbox(frame, self.detect_input);

        let input_value = ort::value::Tensor::from_array(input).map_err(AnalyzeError::backend)?;
        let outputs = self
            .detect_session
            .run(ort::inputs![input_value])
            .map_err(AnalyzeError::backend)?;
        if outputs.len() == 0 {
            return Err(AnalyzeError::backend("face detector produced no outputs"));
        }

        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(AnalyzeError::backend)?;
        let shape = tensor.shape();

        // YOLO output is [1, num_features, num_detections] (transposed) or
        // [1, num_detections, num_features]. Handle both.
        let (num_dets, num_feats, transposed) = match shape {
            [1, a, b] if a < b => (*b, *a, true),
            [1, a, b] => (*a, *b, false),
            _ => {
                return Err(AnalyzeError::backend(format!(
                    "unexpected detector output shape: {shape:?}"
                )))
            }
        };

        let data = tensor
            .as_slice()
            .ok_or_else(|| AnalyzeError::backend("detector output is not contiguous"))?;

        let mut raw = Vec::new();
        for i in 0..num_dets {
            let row: Vec<f32> = if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };
            if row.len() < 5 {
                continue;
            }

            // row: [cx, cy, w, h, conf, ...]; keypoints, if present, are
            // ignored — the attribute head works on the box crop alone.
            let conf = row[4] as f64;
            if conf < self.confidence {
                continue;
            }

            let cx = row[0] as f64;
            let cy = row[1] as f64;
            let w = row[2] as f64;
            let h = row[3] as f64;

            // Map letterbox coordinates back to frame coordinates.
            raw.push(RawDetection {
                x1: ((cx - w / 2.0) - pad_x as f64) / scale,
                y1: ((cy - h / 2.0) - pad_y as f64) / scale,
                x2: ((cx + w / 2.0) - pad_x as f64) / scale,
                y2: ((cy + h / 2.0) - pad_y as f64) / scale,
                confidence: conf,
            });
        }

        let kept = nms(&mut raw, NMS_IOU_THRESH);

        let regions = kept
            .iter()
            .filter_map(|d| {
                FaceRegion::new(
                    d.x1.round() as i32,
                    d.y1.round() as i32,
                    (d.x2 - d.x1).round() as i32,
                    (d.y2 - d.y1).round() as i32,
                )
                .clamped(frame.width(), frame.height())
            })
            .collect();
        Ok(regions)
    }

    fn estimate_attributes(
        &mut self,
        frame: &Frame,
        region: &FaceRegion,
    ) -> Result<(HashMap<String, f32>, u32), AnalyzeError> {
        let input = face_input_tensor(frame, region, self.attr_input);

        let input_value = ort::value::Tensor::from_array(input).map_err(AnalyzeError::backend)?;
        let outputs = self
            .attr_session
            .run(ort::inputs![input_value])
            .map_err(AnalyzeError::backend)?;
        if outputs.len() == 0 {
            return Err(AnalyzeError::backend("attribute head produced no outputs"));
        }

        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(AnalyzeError::backend)?;
        let row = tensor
            .as_slice()
            .ok_or_else(|| AnalyzeError::backend("attribute output is not contiguous"))?;

        decode_attributes(row).ok_or_else(|| {
            AnalyzeError::backend(format!(
                "attribute head returned {} values, expected at least 3",
                row.len()
            ))
        })
    }
}

impl FaceAnalyzer for OnnxAttributeAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, AnalyzeError> {
        let regions = self.detect_faces(frame)?;

        // Face enforcement: an empty detection set is a distinguishable
        // failure, never an empty success.
        if regions.is_empty() {
            return Err(AnalyzeError::NoFaceDetected);
        }

        let mut result = Vec::with_capacity(regions.len());
        for region in regions {
            let (gender_scores, age) = self.estimate_attributes(frame, &region)?;
            result.push(FaceObservation {
                region,
                gender_scores,
                age,
            });
        }
        Ok(result)
    }
}

fn build_session(model_path: &Path) -> Result<ort::session::Session, Box<dyn std::error::Error>> {
    Ok(ort::session::Session::builder()?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?)
}

/// Platform-preferred ONNX execution providers; `ort` falls back to CPU
/// when the accelerated provider is unavailable.
fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Square input height/width of a session's first input, if the model
/// declares a concrete NCHW shape.
fn tensor_input_size(session: &ort::session::Session) -> Option<u32> {
    let input = session.inputs().first()?;
    if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
        if shape.len() >= 4 && shape[2] > 0 {
            return Some(shape[2] as u32);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Frame bytes are BGR; the detector expects RGB, so channels are swapped
/// during the copy. Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Pad with 114/255 gray, the YOLO training convention.
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8, BGR
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, 2 - c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

/// Square crop around the region, resized to the attribute-head input.
///
/// The head is trained on raw 0-255 RGB values, so no normalization is
/// applied beyond the BGR→RGB swap.
fn face_input_tensor(frame: &Frame, region: &FaceRegion, input_size: u32) -> ndarray::Array4<f32> {
    let fw = frame.width() as i32;
    let fh = frame.height() as i32;

    let cx = region.x + region.width / 2;
    let cy = region.y + region.height / 2;
    let half = (region.width.max(region.height) / 2).max(1);

    let x1 = (cx - half).max(0);
    let y1 = (cy - half).max(0);
    let x2 = (cx + half).min(fw);
    let y2 = (cy + half).min(fh);
    let crop_w = (x2 - x1).max(1) as f64;
    let crop_h = (y2 - y1).max(1) as f64;

    let src = frame.as_ndarray();
    let size = input_size as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));

    for ty in 0..size {
        let sy = (y1 as f64 + (ty as f64 + 0.5) * crop_h / size as f64) as usize;
        let sy = sy.min(fh as usize - 1);
        for tx in 0..size {
            let sx = (x1 as f64 + (tx as f64 + 0.5) * crop_w / size as f64) as usize;
            let sx = sx.min(fw as usize - 1);
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[sy, sx, 2 - c]] as f32;
            }
        }
    }
    tensor
}

/// Decode an attribute-head row `[female, male, age/100, ...]` into gender
/// scores and a whole-year age. `None` when the row is too short.
fn decode_attributes(row: &[f32]) -> Option<(HashMap<String, f32>, u32)> {
    if row.len() < 3 {
        return None;
    }
    let (woman, man) = softmax2(row[0], row[1]);
    let scores = HashMap::from([
        (GENDER_LABELS[0].to_string(), woman),
        (GENDER_LABELS[1].to_string(), man),
    ]);
    let age = (row[2] * 100.0).round().clamp(0.0, MAX_AGE as f32) as u32;
    Some((scores, age))
}

fn softmax2(a: f32, b: f32) -> (f32, f32) {
    let m = a.max(b);
    let ea = (a - m).exp();
    let eb = (b - m).exp();
    let sum = ea + eb;
    (ea / sum, eb / sum)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<RawDetection> = Vec::new();
    for det in dets.iter() {
        let dominated = keep
            .iter()
            .any(|k| bbox_iou(&[det.x1, det.y1, det.x2, det.y2], &[k.x1, k.y1, k.x2, k.y2]) > iou_thresh);
        if !dominated {
            keep.push(det.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
