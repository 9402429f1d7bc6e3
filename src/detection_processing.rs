//! Per-frame pipeline: resize, detect, rank, annotate.

use std::time::{Duration, Instant};
use crate::annotator::Annotator;
use crate::common::{Detection, DominantLabel, Frame, RawDetection};
use crate::data::{DetectorConfig, TimeCalc};
use crate::detection_ranker::{rank_and_select, RankThresholds};
use crate::detection_runners::{Detector, InferenceParams, OrtDetector};
use crate::error::{DetectError, Result};
use crate::image_ops;

const PROFILE_EVERY: usize = 100;

/// A frame after processing, together with its dominant label.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedFrame {
    pub frame: Frame,
    pub label: DominantLabel,
}

impl ProcessedFrame {
    fn unannotated(frame: Frame) -> Self {
        Self {
            frame,
            label: DominantLabel::NoDetection,
        }
    }
}

pub struct FrameProcessor<D: Detector> {
    detector: D,
    annotator: Annotator,
    target_height: u32,
    params: InferenceParams,
    thresholds: RankThresholds,
    profile: bool,
    timings: TimeCalc,
}

impl FrameProcessor<OrtDetector> {
    /// Validates the config and loads the ONNX model it points to.
    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        config.validate()?;
        let detector = OrtDetector::new(config)?;
        Ok(Self::new(detector, config))
    }
}

impl<D: Detector> FrameProcessor<D> {
    pub fn new(detector: D, config: &DetectorConfig) -> Self {
        Self {
            detector,
            annotator: Annotator::load(config.font_path.as_deref(), config.label_font_px),
            target_height: config.target_height,
            params: config.inference_params(),
            thresholds: config.rank_thresholds(),
            profile: config.profile,
            timings: TimeCalc::default(),
        }
    }

    pub fn with_annotator(mut self, annotator: Annotator) -> Self {
        self.annotator = annotator;
        self
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn thresholds(&self) -> &RankThresholds {
        &self.thresholds
    }

    /// Resizes `frame` to the target height, runs the detector and draws every
    /// detection in confidence order.
    ///
    /// Never fails: when resizing, detection, class name lookup or box validation goes wrong the
    /// problem is logged and the resized frame (or a copy of the input if the resize
    /// itself failed) is returned untouched with [`DominantLabel::NoDetection`].
    pub fn process(&mut self, frame: &Frame) -> ProcessedFrame {
        let t_resize = Instant::now();
        let resized = match image_ops::resize_to_height(frame, self.target_height) {
            Ok(resized) => resized,
            Err(err) => {
                log::warn!("Frame {}: {}", frame.index, err);
                return ProcessedFrame::unannotated(frame.clone());
            }
        };
        let t_resize = t_resize.elapsed();

        let t_detect = Instant::now();
        let detections = match self.detect_named(&resized) {
            Ok(detections) => detections,
            Err(err) => {
                log::warn!("Frame {}: {}", frame.index, err);
                return ProcessedFrame::unannotated(resized);
            }
        };
        let t_detect = t_detect.elapsed();

        let t_draw = Instant::now();
        let mut annotated = resized;
        let label = if detections.is_empty() {
            DominantLabel::NoDetection
        } else {
            let (ranked, label) = rank_and_select(detections, &self.thresholds);
            self.annotator.draw_all(&mut annotated, &ranked);
            self.annotator.draw_status(&mut annotated, label);
            label
        };
        let t_draw = t_draw.elapsed();

        log::trace!("Frame {}: {}", annotated.index, label);
        self.record(t_resize, t_detect, t_draw);

        ProcessedFrame {
            frame: annotated,
            label,
        }
    }

    /// Runs the detector, resolves every class id to its name and clamps every
    /// box into the frame.
    fn detect_named(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        let raw = self
            .detector
            .detect(frame, &self.params)
            .map_err(DetectError::Detector)?;
        let names = self.detector.class_names();
        let (width, height) = frame.dimensions();
        raw.into_iter().map(|r| resolve(r, names, width, height)).collect()
    }

    fn record(&mut self, resize: Duration, detect: Duration, draw: Duration) {
        if !self.profile {
            return;
        }
        self.timings.add_or_push(0, resize);
        self.timings.add_or_push(1, detect);
        self.timings.add_or_push(2, draw);

        let n = self.timings.n();
        if n % PROFILE_EVERY == 0 {
            log::info!(
                "[Profile] {} frames | {:?} avg [resize: {:?} | detect: {:?} | draw: {:?}]",
                n,
                self.timings.avg(),
                self.timings.avg_i(0),
                self.timings.avg_i(1),
                self.timings.avg_i(2),
            );
        }
    }
}

fn resolve(raw: RawDetection, names: &[String], width: u32, height: u32) -> Result<Detection> {
    let name = names.get(raw.class_id).ok_or(DetectError::UnknownClass {
        class_id: raw.class_id,
        num_classes: names.len(),
    })?;
    let bbox = raw.bbox;
    if !bbox.fits(width, height) {
        return Err(DetectError::InvalidBox {
            x1: bbox.x1,
            y1: bbox.y1,
            x2: bbox.x2,
            y2: bbox.y2,
            width,
            height,
        });
    }
    Ok(Detection::new(bbox.clamped(width, height), name, raw.confidence))
}
