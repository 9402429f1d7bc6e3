use serde::{Deserialize, Serialize};

/// Axis-aligned box in integer pixel coordinates of the frame it was detected on.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Rounds floating point `(x1, y1, x2, y2)` coordinates to the nearest pixel.
    pub fn from_x1y1_x2y2_f32(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.round() as i32,
            y1: y1.round() as i32,
            x2: x2.round() as i32,
            y2: y2.round() as i32,
        }
    }

    /// Returns the width of the bounding box.
    pub fn width(&self) -> i32 {
        self.x2 - self.x1
    }

    /// Returns the height of the bounding box.
    pub fn height(&self) -> i32 {
        self.y2 - self.y1
    }

    /// Computes the area of the bounding box. Degenerate boxes have zero area.
    pub fn area(&self) -> i64 {
        self.width().max(0) as i64 * self.height().max(0) as i64
    }

    /// Computes the intersection area between this bounding box and another.
    pub fn intersect(&self, other: &BoundingBox) -> i64 {
        let left = self.x1.max(other.x1);
        let right = self.x2.min(other.x2);
        let top = self.y1.max(other.y1);
        let bottom = self.y2.min(other.y2);
        (right - left).max(0) as i64 * (bottom - top).max(0) as i64
    }

    /// Computes the union area between this bounding box and another.
    pub fn union(&self, other: &BoundingBox) -> i64 {
        self.area() + other.area() - self.intersect(other)
    }

    /// Intersection over union, 0 when both boxes are degenerate.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let union = self.union(other);
        if union <= 0 {
            return 0.;
        }
        self.intersect(other) as f32 / union as f32
    }

    /// Returns the bounding box coordinates as `(x1, y1, x2, y2)`.
    pub fn xy1_xy2(&self) -> (i32, i32, i32, i32) {
        (self.x1, self.y1, self.x2, self.y2)
    }

    /// True when the box is ordered and overlaps a `width` x `height` frame.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        let (w, h) = (width as i64, height as i64);
        self.x1 <= self.x2
            && self.y1 <= self.y2
            && (self.x2 as i64) >= 0
            && (self.y2 as i64) >= 0
            && (self.x1 as i64) < w
            && (self.y1 as i64) < h
    }

    /// Clamps the box into a `width` x `height` frame.
    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as i32, height as i32);
        Self {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        }
    }
}
