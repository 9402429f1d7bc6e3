use serde::{Deserialize, Serialize};
use crate::common::BoundingBox;

/// One detector hit before the class id is resolved to a name.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub bbox: BoundingBox,
    pub class_id: usize,
    pub confidence: f32,
}

impl RawDetection {
    pub fn new(bbox: BoundingBox, class_id: usize, confidence: f32) -> Self {
        Self {
            bbox,
            class_id,
            confidence,
        }
    }
}

/// A detection with its class resolved to a human readable name.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class_name: String,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class_name: &str, confidence: f32) -> Self {
        Self {
            bbox,
            class_name: class_name.to_string(),
            confidence,
        }
    }

    /// Sets the confidence score of the detection.
    pub fn with_confidence(mut self, conf: f32) -> Self {
        self.confidence = conf;
        self
    }

    /// Sets the class name of the detection.
    pub fn with_class_name(mut self, class_name: &str) -> Self {
        self.class_name = class_name.to_string();
        self
    }

    /// Case-insensitive comparison of the class name.
    pub fn is_class(&self, name: &str) -> bool {
        self.class_name.eq_ignore_ascii_case(name)
    }

    /// Text shown next to the box, e.g. `Fire: 0.87`.
    pub fn caption(&self) -> String {
        format!("{}: {:.2}", self.class_name, self.confidence)
    }
}
