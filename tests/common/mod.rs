#![allow(dead_code)]

use anyhow::bail;
use image::{Rgb, RgbImage};
use fire_detect::common::{BoundingBox, Frame, RawDetection};
use fire_detect::detection_runners::{Detector, InferenceParams};

pub const NAMES: [&str; 3] = ["Fire", "Smoke", "person"];

/// Returns the same detections for every frame, or fails when `fail` is set.
pub struct FakeDetector {
    pub detections: Vec<RawDetection>,
    pub names: Vec<String>,
    pub fail: bool,
    pub calls: usize,
    pub last_params: Option<InferenceParams>,
    pub last_size: Option<(u32, u32)>,
}

impl FakeDetector {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self {
            detections,
            names: NAMES.iter().map(|s| s.to_string()).collect(),
            fail: false,
            calls: 0,
            last_params: None,
            last_size: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }
}

impl Detector for FakeDetector {
    fn detect(&mut self, frame: &Frame, params: &InferenceParams) -> anyhow::Result<Vec<RawDetection>> {
        self.calls += 1;
        self.last_params = Some(*params);
        self.last_size = Some(frame.dimensions());
        if self.fail {
            bail!("inference backend unavailable");
        }
        Ok(self.detections.clone())
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }
}

pub fn raw(x1: i32, y1: i32, x2: i32, y2: i32, class_id: usize, confidence: f32) -> RawDetection {
    RawDetection::new(BoundingBox::new(x1, y1, x2, y2), class_id, confidence)
}

/// A 1280x720 frame with a horizontal gradient, so resizing is observable.
pub fn gradient_frame() -> Frame {
    Frame::from(RgbImage::from_fn(1280, 720, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64])))
}
