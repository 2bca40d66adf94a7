#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::nms::non_max_suppression;
use crate::detect::result::BoundingBox;
use crate::frame::Frame;

const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_SCORE_FLOOR: f32 = 0.01;

/// Tract-based backend for YOLOv8-style ONNX detection models.
///
/// The model is expected to take `[1, 3, S, S]` RGB input in `0..1` and emit
/// `[1, 4 + classes, anchors]` with centre/size boxes in input pixels.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    names: Vec<String>,
    iou_threshold: f32,
    score_floor: f32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        if input_size == 0 {
            return Err(anyhow!("model input size must be > 0"));
        }
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            input_size,
            names: Vec::new(),
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            score_floor: DEFAULT_SCORE_FLOOR,
        })
    }

    /// Class names indexed by class id.
    pub fn with_names(mut self, names: Vec<String>) -> Self {
        self.names = names;
        self
    }

    pub fn with_iou_threshold(mut self, iou_threshold: f32) -> Self {
        self.iou_threshold = iou_threshold;
        self
    }

    fn build_input(&self, frame: &Frame) -> Tensor {
        let side = self.input_size;
        let resized = imageops::resize(frame.image(), side, side, FilterType::Triangle);
        let side = side as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
            resized.get_pixel(x as u32, y as u32).0[c] as f32 / 255.0
        });
        input.into_tensor()
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Vec<BoundingBox>> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?
            .into_dimensionality::<tract_ndarray::Ix3>()
            .context("model output must be [1, 4 + classes, anchors]")?;

        let (_, channels, anchors) = view.dim();
        if channels <= 4 {
            return Err(anyhow!("model output has {} channels, expected > 4", channels));
        }

        let sx = frame.width() as f32 / self.input_size as f32;
        let sy = frame.height() as f32 / self.input_size as f32;

        let mut boxes = Vec::new();
        for i in 0..anchors {
            let (class_id, score) = (4..channels)
                .map(|c| (c - 4, view[[0, c, i]]))
                .fold((0, f32::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
            if !score.is_finite() || score < self.score_floor {
                continue;
            }
            let b = BoundingBox::from_center(
                view[[0, 0, i]] * sx,
                view[[0, 1, i]] * sy,
                view[[0, 2, i]] * sx,
                view[[0, 3, i]] * sy,
            );
            boxes.push(b.with_confidence(score.min(1.0)).with_label(self.label(class_id)));
        }

        Ok(non_max_suppression(boxes, self.iou_threshold))
    }

    fn label(&self, class_id: usize) -> String {
        self.names
            .get(class_id)
            .cloned()
            .unwrap_or_else(|| format!("class{}", class_id))
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err(anyhow!("cannot run inference on an empty frame"));
        }
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.decode(outputs, frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        let frame = Frame::filled(self.input_size, self.input_size, [114, 114, 114]);
        self.infer(&frame).map(|_| ())
    }
}
