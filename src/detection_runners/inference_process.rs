use std::time::Instant;
use ndarray::{Array, Array4, IxDyn};
use serde::{Deserialize, Serialize};
use crate::common::{Frame, RawDetection};
use crate::utils;

/// Thresholds passed to the model on every call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceParams {
    pub iou_threshold: f32,
    pub min_confidence: f32,
}

impl Default for InferenceParams {
    fn default() -> Self {
        Self {
            iou_threshold: 0.2,
            min_confidence: 0.5,
        }
    }
}

impl InferenceParams {
    pub fn new(iou_threshold: f32, min_confidence: f32) -> Self {
        Self {
            iou_threshold,
            min_confidence,
        }
    }
}

/// An object detector. `class_names()[class_id]` names every id `detect` can return.
pub trait Detector {
    fn detect(&mut self, frame: &Frame, params: &InferenceParams) -> anyhow::Result<Vec<RawDetection>>;

    fn class_names(&self) -> &[String];
}

impl<D: Detector + ?Sized> Detector for Box<D> {
    fn detect(&mut self, frame: &Frame, params: &InferenceParams) -> anyhow::Result<Vec<RawDetection>> {
        (**self).detect(frame, params)
    }

    fn class_names(&self) -> &[String] {
        (**self).class_names()
    }
}

/// Staged model execution for detectors backed by a tensor runtime.
pub trait InferenceProcess {
    /// Pre-process a frame into the model input tensor.
    fn preprocess(&mut self, frame: &Frame) -> anyhow::Result<(Array4<f32>, f32)>;

    /// Executes the model on the preprocessed data.
    fn inference(&mut self, xs: Array4<f32>) -> anyhow::Result<Array<f32, IxDyn>>;

    /// Decodes the model output back into frame coordinates.
    fn postprocess(
        &self,
        ys: Array<f32, IxDyn>,
        frame: &Frame,
        scale: f32,
        params: &InferenceParams,
    ) -> anyhow::Result<Vec<RawDetection>>;

    /// Executes the full pipeline, tracing the time spent in each stage.
    fn forward(&mut self, frame: &Frame, params: &InferenceParams) -> anyhow::Result<Vec<RawDetection>> {
        let detect_time = Instant::now();
        let mut detect_elapsed = detect_time.elapsed();

        let (xs, scale) = self.preprocess(frame)?;
        detect_elapsed = utils::trace("TIME", "Preprocessing input", detect_time, detect_elapsed);

        let ys = self.inference(xs)?;
        detect_elapsed = utils::trace("TIME", "Detection run", detect_time, detect_elapsed);

        let detections = self.postprocess(ys, frame, scale, params)?;
        utils::trace("TIME", "Postprocessing", detect_time, detect_elapsed);

        Ok(detections)
    }
}
