//! Box, corner bracket and caption rendering.

use std::path::{Path, PathBuf};
use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use crate::common::{BoundingBox, Detection, DominantLabel, Frame};

pub const FIRE_COLOUR: Rgb<u8> = Rgb([255, 0, 0]);
pub const SMOKE_COLOUR: Rgb<u8> = Rgb([128, 128, 128]);
pub const DEFAULT_COLOUR: Rgb<u8> = Rgb([0, 255, 0]);
const TEXT_COLOUR: Rgb<u8> = Rgb([255, 255, 255]);
const BORDER_COLOUR: Rgb<u8> = Rgb([0, 0, 0]);

pub const LINE_THICKNESS: i32 = 2;
pub const CORNER_LENGTH: i32 = 20;
/// Boxes closer than this to the top edge get their caption below the box.
pub const LABEL_HEIGHT: i32 = 30;
const LABEL_GAP: i32 = 5;
const LABEL_OFFSET: i32 = 5;
const LABEL_BORDER: i32 = 2;
const LABEL_FILL_ALPHA: f32 = 0.75;
const STATUS_ORIGIN: (i32, i32) = (10, 10);

const FONT_CANDIDATES: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
];

pub fn class_colour(class_name: &str) -> Rgb<u8> {
    match class_name.to_lowercase().as_str() {
        "fire" => FIRE_COLOUR,
        "smoke" => SMOKE_COLOUR,
        _ => DEFAULT_COLOUR,
    }
}

/// Where a caption goes for a given box. `baseline_y` is the bottom of the text,
/// `background` the filled rectangle behind it as inclusive `(x1, y1, x2, y2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelLayout {
    pub text_x: i32,
    pub baseline_y: i32,
    pub background: (i32, i32, i32, i32),
}

/// Captions sit just above the box unless that would clip off the top of the frame.
pub fn label_baseline(bbox: &BoundingBox) -> i32 {
    if bbox.y1 < LABEL_HEIGHT {
        bbox.y2 + LABEL_HEIGHT
    } else {
        bbox.y1 - LABEL_GAP
    }
}

pub fn label_layout(bbox: &BoundingBox, text_w: u32, text_h: u32) -> LabelLayout {
    let text_x = bbox.x1;
    let baseline_y = label_baseline(bbox);
    LabelLayout {
        text_x,
        baseline_y,
        background: (
            text_x - LABEL_OFFSET,
            baseline_y - text_h as i32 - LABEL_OFFSET,
            text_x + text_w as i32 + LABEL_OFFSET,
            baseline_y + LABEL_OFFSET,
        ),
    }
}

pub struct Annotator {
    font: Option<FontVec>,
    scale: PxScale,
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("font", &self.font.is_some())
            .field("scale", &self.scale.y)
            .finish()
    }
}

impl Annotator {
    pub fn new(font: Option<FontVec>, font_px: f32) -> Self {
        Self {
            font,
            scale: PxScale::from(font_px),
        }
    }

    /// Loads the caption font from `font_path`, or from the first well-known
    /// system font found. Without a font, captions are drawn as empty plates.
    pub fn load(font_path: Option<&Path>, font_px: f32) -> Self {
        let candidates: Vec<PathBuf> = match font_path {
            Some(p) => vec![p.to_path_buf()],
            None => FONT_CANDIDATES.iter().map(PathBuf::from).collect(),
        };

        for path in candidates.iter() {
            let bytes = match std::fs::read(path) {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    log::info!("Caption font loaded from {}", path.display());
                    return Self::new(Some(font), font_px);
                }
                Err(err) => log::warn!("{} is not a usable font: {}", path.display(), err),
            }
        }

        log::warn!("No caption font found, labels will be drawn without text");
        Self::new(None, font_px)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn text_size(&self, text: &str) -> (u32, u32) {
        match &self.font {
            Some(font) => text_size(self.scale, font, text),
            None => (
                (text.chars().count() as f32 * self.scale.x * 0.55).round() as u32,
                (self.scale.y * 0.7).round() as u32,
            ),
        }
    }

    /// Draws one detection: box outline, corner brackets and caption plate.
    /// The box is clamped into the frame first.
    pub fn draw(&self, frame: &mut Frame, detection: &Detection) {
        let colour = class_colour(&detection.class_name);
        let bbox = detection.bbox.clamped(frame.width(), frame.height());
        let (x1, y1, x2, y2) = bbox.xy1_xy2();
        let img: &mut RgbImage = &mut frame.image;

        draw_box(img, x1, y1, x2, y2, colour);
        draw_corners(img, x1, y1, x2, y2, colour);

        let caption = detection.caption();
        let (text_w, text_h) = self.text_size(&caption);
        let layout = label_layout(&bbox, text_w, text_h);
        self.draw_plate(img, &layout, &caption, text_h, colour);
    }

    pub fn draw_all(&self, frame: &mut Frame, detections: &[Detection]) {
        for detection in detections {
            self.draw(frame, detection);
        }
    }

    /// Frame level banner in the top-left corner. Nothing is drawn for `NoDetection`.
    pub fn draw_status(&self, frame: &mut Frame, label: DominantLabel) {
        let (text, colour) = match label {
            DominantLabel::NoDetection => return,
            DominantLabel::Fire => ("FIRE DETECTED", FIRE_COLOUR),
            DominantLabel::Smoke => ("SMOKE DETECTED", SMOKE_COLOUR),
        };
        let (text_w, text_h) = self.text_size(text);
        let text_x = STATUS_ORIGIN.0 + LABEL_OFFSET;
        let baseline_y = STATUS_ORIGIN.1 + LABEL_OFFSET + text_h as i32;
        let layout = LabelLayout {
            text_x,
            baseline_y,
            background: (
                STATUS_ORIGIN.0,
                STATUS_ORIGIN.1,
                text_x + text_w as i32 + LABEL_OFFSET,
                baseline_y + LABEL_OFFSET,
            ),
        };
        self.draw_plate(&mut frame.image, &layout, text, text_h, colour);
    }

    fn draw_plate(&self, img: &mut RgbImage, layout: &LabelLayout, text: &str, text_h: u32, colour: Rgb<u8>) {
        let (bx1, by1, bx2, by2) = layout.background;
        blend_rect(img, bx1, by1, bx2, by2, colour, LABEL_FILL_ALPHA);
        draw_outline(img, bx1, by1, bx2, by2, LABEL_BORDER, BORDER_COLOUR);

        if let Some(font) = &self.font {
            draw_text_mut(img, TEXT_COLOUR, layout.text_x, layout.baseline_y - text_h as i32, self.scale, font, text);
        }
    }
}

fn draw_box(img: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, colour: Rgb<u8>) {
    hline(img, x1, x2, y1, colour);
    hline(img, x1, x2, y2, colour);
    vline(img, x1, y1, y2, colour);
    vline(img, x2, y1, y2, colour);
}

fn draw_corners(img: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, colour: Rgb<u8>) {
    hline(img, x1, x1 + CORNER_LENGTH, y1, colour);
    vline(img, x1, y1, y1 + CORNER_LENGTH, colour);

    hline(img, x2, x2 - CORNER_LENGTH, y1, colour);
    vline(img, x2, y1, y1 + CORNER_LENGTH, colour);

    hline(img, x1, x1 + CORNER_LENGTH, y2, colour);
    vline(img, x1, y2, y2 - CORNER_LENGTH, colour);

    hline(img, x2, x2 - CORNER_LENGTH, y2, colour);
    vline(img, x2, y2, y2 - CORNER_LENGTH, colour);
}

fn hline(img: &mut RgbImage, xa: i32, xb: i32, y: i32, colour: Rgb<u8>) {
    let top = y - LINE_THICKNESS / 2;
    fill_rect(img, xa, top, xb, top + LINE_THICKNESS - 1, colour);
}

fn vline(img: &mut RgbImage, x: i32, ya: i32, yb: i32, colour: Rgb<u8>) {
    let left = x - LINE_THICKNESS / 2;
    fill_rect(img, left, ya, left + LINE_THICKNESS - 1, yb, colour);
}

fn draw_outline(img: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, thickness: i32, colour: Rgb<u8>) {
    fill_rect(img, x1, y1, x2, y1 + thickness - 1, colour);
    fill_rect(img, x1, y2 - thickness + 1, x2, y2, colour);
    fill_rect(img, x1, y1, x1 + thickness - 1, y2, colour);
    fill_rect(img, x2 - thickness + 1, y1, x2, y2, colour);
}

/// Opaque fill of the inclusive rectangle spanned by two corners, clipped by imageproc.
fn fill_rect(img: &mut RgbImage, xa: i32, ya: i32, xb: i32, yb: i32, colour: Rgb<u8>) {
    let (left, right) = (xa.min(xb), xa.max(xb));
    let (top, bottom) = (ya.min(yb), ya.max(yb));
    let width = (right as i64 - left as i64 + 1).min(u32::MAX as i64) as u32;
    let height = (bottom as i64 - top as i64 + 1).min(u32::MAX as i64) as u32;
    let rect = Rect::at(left, top).of_size(width, height);
    draw_filled_rect_mut(img, rect, colour);
}

fn blend_rect(img: &mut RgbImage, x1: i32, y1: i32, x2: i32, y2: i32, colour: Rgb<u8>, alpha: f32) {
    let (w, h) = (img.width() as i32, img.height() as i32);
    let (left, right) = (x1.min(x2).max(0), x1.max(x2).min(w - 1));
    let (top, bottom) = (y1.min(y2).max(0), y1.max(y2).min(h - 1));
    if left > right || top > bottom {
        return;
    }

    for y in top..=bottom {
        for x in left..=right {
            let px = img.get_pixel_mut(x as u32, y as u32);
            for c in 0..3 {
                let v = alpha * colour.0[c] as f32 + (1. - alpha) * px.0[c] as f32;
                px.0[c] = v.round().clamp(0., 255.) as u8;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black(w: u32, h: u32) -> Frame {
        Frame::from(RgbImage::new(w, h))
    }

    fn fire_at(x1: i32, y1: i32, x2: i32, y2: i32) -> Detection {
        Detection::new(BoundingBox::new(x1, y1, x2, y2), "Fire", 0.87)
    }

    #[test]
    fn colours_by_class() {
        assert_eq!(class_colour("FIRE"), FIRE_COLOUR);
        assert_eq!(class_colour("Smoke"), SMOKE_COLOUR);
        assert_eq!(class_colour("person"), DEFAULT_COLOUR);
    }

    #[test]
    fn label_goes_below_box_near_the_top() {
        let b = BoundingBox::new(50, 10, 150, 120);
        assert_eq!(label_baseline(&b), 150);
        let layout = label_layout(&b, 80, 20);
        assert_eq!(layout.text_x, 50);
        assert_eq!(layout.background, (45, 125, 135, 155));
    }

    #[test]
    fn label_goes_above_box_otherwise() {
        let b = BoundingBox::new(50, 100, 150, 220);
        assert_eq!(label_baseline(&b), 95);
        // y1 == 30 is not "within" the label height
        assert_eq!(label_baseline(&BoundingBox::new(0, 30, 10, 40)), 25);
    }

    #[test]
    fn box_outline_and_corners_use_class_colour() {
        let annotator = Annotator::new(None, 32.);
        let mut frame = black(400, 300);
        // wide box so part of the top edge is not under the caption plate
        annotator.draw(&mut frame, &fire_at(100, 100, 380, 200));

        // edges
        assert_eq!(*frame.get_pixel(340, 100), FIRE_COLOUR);
        assert_eq!(*frame.get_pixel(340, 99), FIRE_COLOUR);
        assert_eq!(*frame.get_pixel(100, 150), FIRE_COLOUR);
        assert_eq!(*frame.get_pixel(380, 150), FIRE_COLOUR);
        assert_eq!(*frame.get_pixel(240, 200), FIRE_COLOUR);
        // interior stays untouched
        assert_eq!(*frame.get_pixel(240, 150), Rgb([0, 0, 0]));
        // corner bracket ends
        assert_eq!(*frame.get_pixel(360, 100), FIRE_COLOUR);
        assert_eq!(*frame.get_pixel(120, 200), FIRE_COLOUR);
        assert_eq!(*frame.get_pixel(100, 180), FIRE_COLOUR);
    }

    #[test]
    fn caption_plate_has_black_border_and_blended_fill() {
        let annotator = Annotator::new(None, 32.);
        let mut frame = black(400, 300);
        let det = Detection::new(BoundingBox::new(100, 100, 250, 200), "Smoke", 0.9);
        annotator.draw(&mut frame, &det);

        let (tw, th) = annotator.text_size(&det.caption());
        let layout = label_layout(&det.bbox, tw, th);
        let (bx1, by1, bx2, by2) = layout.background;
        assert_eq!(by2, 100);
        assert_eq!(*frame.get_pixel((bx1 + 1) as u32, ((by1 + by2) / 2) as u32), BORDER_COLOUR);
        let inside = *frame.get_pixel(((bx1 + bx2) / 2) as u32, ((by1 + by2) / 2) as u32);
        assert_eq!(inside, Rgb([96, 96, 96]));
    }

    #[test]
    fn drawing_clips_at_frame_edges() {
        let annotator = Annotator::new(None, 32.);
        let mut frame = black(64, 48);
        annotator.draw(&mut frame, &fire_at(-20, 2, 100, 60));
        assert_eq!(frame.dimensions(), (64, 48));
        assert_eq!(*frame.get_pixel(10, 2), FIRE_COLOUR);
    }

    #[test]
    fn extreme_coordinates_are_clamped() {
        let annotator = Annotator::new(None, 32.);
        let mut frame = black(64, 48);
        annotator.draw(&mut frame, &fire_at(i32::MIN, 40, i32::MAX, i32::MAX));
        assert_eq!(*frame.get_pixel(0, 44), FIRE_COLOUR);
        assert_eq!(*frame.get_pixel(63, 44), FIRE_COLOUR);
    }

    #[test]
    fn drawing_twice_differs_from_drawing_once() {
        let annotator = Annotator::new(None, 32.);
        let det = fire_at(20, 60, 120, 140);
        let mut once = black(200, 200);
        let mut twice = once.clone();

        annotator.draw(&mut once, &det);
        annotator.draw(&mut twice, &det);
        annotator.draw(&mut twice, &det);

        assert_ne!(once, twice);
    }

    #[test]
    fn status_banner_only_when_detected() {
        let annotator = Annotator::new(None, 32.);
        let mut frame = black(200, 100);
        let untouched = frame.clone();
        annotator.draw_status(&mut frame, DominantLabel::NoDetection);
        assert_eq!(frame, untouched);
        annotator.draw_status(&mut frame, DominantLabel::Fire);
        assert_ne!(frame, untouched);
        assert_eq!(*frame.get_pixel(10, 10), BORDER_COLOUR);
    }

    #[test]
    fn missing_font_file_falls_back() {
        let annotator = Annotator::load(Some(Path::new("/nonexistent/font.ttf")), 20.);
        assert!(!annotator.has_font());
        assert!(annotator.text_size("Fire: 0.50").0 > 0);
    }
}
