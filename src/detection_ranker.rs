//! Confidence ranking and dominant label selection.

use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use crate::common::{Detection, DominantLabel};

const FIRE: &str = "fire";
const SMOKE: &str = "smoke";

/// Per-class confidence thresholds used when choosing the dominant label.
///
/// Smoke normally gets the stricter threshold since it produces more false positives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankThresholds {
    pub min_confidence: f32,
    pub smoke_confidence: f32,
}

impl Default for RankThresholds {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            smoke_confidence: 0.75,
        }
    }
}

impl RankThresholds {
    pub fn new(min_confidence: f32, smoke_confidence: f32) -> Self {
        Self {
            min_confidence,
            smoke_confidence,
        }
    }

    /// The label `detection` would produce on its own, if it clears its class threshold.
    pub fn qualify(&self, detection: &Detection) -> Option<DominantLabel> {
        if detection.is_class(FIRE) && detection.confidence >= self.min_confidence {
            Some(DominantLabel::Fire)
        } else if detection.is_class(SMOKE) && detection.confidence >= self.smoke_confidence {
            Some(DominantLabel::Smoke)
        } else {
            None
        }
    }
}

/// Sorts detections by confidence, highest first. The sort is stable so equal
/// confidences keep their input order; NaN confidences go last.
pub fn rank(mut detections: Vec<Detection>) -> Vec<Detection> {
    detections.sort_by(|d1, d2| descending(d1.confidence, d2.confidence));
    detections
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// First qualifying detection in `ranked` order wins, whatever its class.
pub fn select_dominant(ranked: &[Detection], thresholds: &RankThresholds) -> DominantLabel {
    ranked
        .iter()
        .find_map(|d| thresholds.qualify(d))
        .unwrap_or_default()
}

/// Ranks `detections` and picks the dominant label in one pass.
pub fn rank_and_select(detections: Vec<Detection>, thresholds: &RankThresholds) -> (Vec<Detection>, DominantLabel) {
    let ranked = rank(detections);
    let label = select_dominant(&ranked, thresholds);
    (ranked, label)
}
