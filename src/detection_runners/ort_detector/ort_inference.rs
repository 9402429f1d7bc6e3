//! File/code adapted from https://github.com/jamjamjon/usls
//!
//! YOLOv8/v11 detection on top of [`OrtEngine`].

use anyhow::{Context, Result};
use fast_image_resize::Resizer;
use image::RgbImage;
use ndarray::{s, Array, Array4, ArrayView2, Axis, Ix2, IxDyn};
use rayon::prelude::*;
use regex::Regex;
use crate::common::{BoundingBox, Frame, RawDetection};
use crate::data::DetectorConfig;
use crate::detection_runners::inference_process::{Detector, InferenceParams, InferenceProcess};
use crate::detection_runners::ort_detector::nms::nms;
use crate::detection_runners::ort_detector::OrtEngine;
use crate::error::DetectError;
use crate::image_ops::{letterbox, nchw_normalize_flat};
use crate::utils;

const LETTERBOX_FILL: u8 = 114;
/// cx, cy, w, h ahead of the class scores
const BOX_CHANNELS: usize = 4;
const NAMES_PATTERN: &str = r#"(['"])([-()\w '"]+)(['"])"#;

pub struct OrtDetector {
    engine: OrtEngine,
    nc: usize,
    names: Vec<String>,
    resizer: Resizer,
}

impl std::fmt::Debug for OrtDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtDetector")
            .field("engine", &self.engine)
            .field("nc", &self.nc)
            .field("names", &self.names)
            .finish()
    }
}

impl OrtDetector {
    /// Loads the model and resolves the class name table. Any failure is a [`DetectError::ModelLoad`].
    pub fn new(config: &DetectorConfig) -> crate::error::Result<Self> {
        Self::build(config).map_err(DetectError::ModelLoad)
    }

    fn build(config: &DetectorConfig) -> Result<Self> {
        let engine = OrtEngine::new(config)?;
        let configured = Self::configured_names(config, &engine)?;

        let mut detector = Self {
            engine,
            nc: 0,
            names: vec![],
            resizer: Resizer::new(),
        };

        // dry run, also tells the number of classes
        let blank = Frame::from(RgbImage::new(config.model_width, config.model_height));
        let (xs, _) = detector.preprocess(&blank)?;
        let ys = detector.inference(xs)?;
        let nc = num_classes(ys.shape())?;

        let names = match configured {
            Some(names) => {
                if names.len() != nc {
                    log::warn!(
                        "Model predicts {} classes but {} class names were supplied",
                        nc,
                        names.len()
                    );
                }
                names
            }
            None => Self::n2s(nc),
        };
        log::info!("Classes ({}): {:?}", nc, names);

        detector.nc = nc;
        detector.names = names;
        Ok(detector)
    }

    /// Class names from the config, a labels file, or the model's `names` metadata.
    fn configured_names(config: &DetectorConfig, engine: &OrtEngine) -> Result<Option<Vec<String>>> {
        if let Some(names) = &config.class_names {
            return Ok(Some(names.clone()));
        }
        if let Some(path) = &config.labels_path {
            let names = utils::file_to_vec(path)
                .with_context(|| format!("Cannot read labels from {}", path.display()))?;
            return Ok(Some(names));
        }
        Ok(engine.try_fetch("names").map(|names| parse_names(&names)))
    }

    fn n2s(n: usize) -> Vec<String> {
        (0..n).map(|x| format!("# {}", x)).collect::<Vec<String>>()
    }
}

impl InferenceProcess for OrtDetector {
    fn preprocess(&mut self, frame: &Frame) -> Result<(Array4<f32>, f32)> {
        let (w, h) = (self.engine.model_width(), self.engine.model_height());
        let (boxed, scale) = letterbox(&frame.image, w, h, LETTERBOX_FILL, &mut self.resizer)?;
        let flat = nchw_normalize_flat(boxed.buffer(), w as usize, h as usize)?;
        let xs = Array4::from_shape_vec((1, 3, h as usize, w as usize), flat)?;
        Ok((xs, scale))
    }

    fn inference(&mut self, xs: Array4<f32>) -> Result<Array<f32, IxDyn>> {
        self.engine.run(xs)
    }

    fn postprocess(
        &self,
        ys: Array<f32, IxDyn>,
        frame: &Frame,
        scale: f32,
        params: &InferenceParams,
    ) -> Result<Vec<RawDetection>> {
        num_classes(ys.shape())?;
        let preds = ys.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;
        // channels first unless the export transposed it
        let preds = if preds.nrows() > preds.ncols() { preds.reversed_axes() } else { preds };

        let (width, height) = frame.dimensions();
        let mut detections = decode_predictions(preds, scale, width, height, params.min_confidence);
        nms(&mut detections, params.iou_threshold, false);
        Ok(detections)
    }
}

impl Detector for OrtDetector {
    fn detect(&mut self, frame: &Frame, params: &InferenceParams) -> Result<Vec<RawDetection>> {
        self.forward(frame, params)
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }
}

/// Number of classes from a `[1, 4 + nc, anchors]` (or transposed) output shape.
fn num_classes(shape: &[usize]) -> Result<usize> {
    match shape {
        [1, a, b] if (*a).min(*b) > BOX_CHANNELS => Ok((*a).min(*b) - BOX_CHANNELS),
        _ => anyhow::bail!("Unexpected YOLO output shape {:?}", shape),
    }
}

/// Decodes `[4 + nc, anchors]` predictions made on a letterboxed input scaled by
/// `scale`. Keeps the best class per anchor when it scores at least `min_confidence`,
/// maps the box back onto the `width` x `height` frame and drops boxes clamped to nothing.
pub fn decode_predictions(
    preds: ArrayView2<f32>,
    scale: f32,
    width: u32,
    height: u32,
    min_confidence: f32,
) -> Vec<RawDetection> {
    if preds.nrows() <= BOX_CHANNELS || scale <= 0. {
        return vec![];
    }

    (0..preds.ncols())
        .into_par_iter()
        .filter_map(|i| {
            let anchor = preds.column(i);
            let (class_id, &confidence) = anchor
                .slice(s![BOX_CHANNELS..])
                .into_iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))?;

            if confidence < min_confidence {
                return None;
            }

            let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
            let bbox = BoundingBox::from_x1y1_x2y2_f32(
                (cx - w / 2.) / scale,
                (cy - h / 2.) / scale,
                (cx + w / 2.) / scale,
                (cy + h / 2.) / scale,
            )
            .clamped(width, height);

            if bbox.width() <= 0 || bbox.height() <= 0 {
                return None;
            }

            Some(RawDetection::new(bbox, class_id, confidence))
        })
        .collect()
}

/// Class names from YOLO metadata, e.g. `{0: 'fire', 1: 'smoke'}`.
pub fn parse_names(names: &str) -> Vec<String> {
    let re = match Regex::new(NAMES_PATTERN) {
        Ok(re) => re,
        Err(_) => return vec![],
    };
    re.captures_iter(names)
        .map(|x| x.extract())
        .map(|(_, [_, name, _])| name.to_string())
        .collect()
}
