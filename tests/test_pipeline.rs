mod common;

use fire_detect::annotator::{Annotator, FIRE_COLOUR, SMOKE_COLOUR};
use fire_detect::common::{DominantLabel, Frame};
use fire_detect::data::DetectorConfig;
use fire_detect::detection_processing::FrameProcessor;
use fire_detect::detection_runners::InferenceParams;
use fire_detect::image_ops::resize_to_height;
use image::RgbImage;
use common::{gradient_frame, raw, FakeDetector};

fn processor(detector: FakeDetector) -> FrameProcessor<FakeDetector> {
    let config = DetectorConfig::new("unused.onnx").with_target_height(360);
    FrameProcessor::new(detector, &config).with_annotator(Annotator::new(None, 24.))
}

#[test]
fn empty_detection_set_returns_resized_frame() {
    let frame = gradient_frame();
    let mut processor = processor(FakeDetector::new(vec![]));

    let out = processor.process(&frame);

    assert_eq!(out.label, DominantLabel::NoDetection);
    assert_eq!(out.frame.dimensions(), (640, 360));
    assert_eq!(out.frame, resize_to_height(&frame, 360).unwrap());
    assert_eq!(processor.detector().last_size, Some((640, 360)));
}

#[test]
fn higher_confidence_smoke_wins() {
    let frame = gradient_frame();
    let mut processor = processor(FakeDetector::new(vec![
        raw(50, 100, 200, 250, 0, 0.9),
        raw(300, 100, 450, 250, 1, 0.95),
    ]));

    let out = processor.process(&frame);

    assert_eq!(out.label, DominantLabel::Smoke);
    // both boxes are drawn, in their class colour
    assert_eq!(*out.frame.get_pixel(50, 200), FIRE_COLOUR);
    assert_eq!(*out.frame.get_pixel(300, 200), SMOKE_COLOUR);
}

#[test]
fn weak_smoke_is_drawn_but_not_reported() {
    let frame = gradient_frame();
    let mut processor = processor(FakeDetector::new(vec![raw(100, 100, 300, 300, 1, 0.6)]));

    let out = processor.process(&frame);

    assert_eq!(out.label, DominantLabel::NoDetection);
    assert_ne!(out.frame, resize_to_height(&frame, 360).unwrap());
    assert_eq!(*out.frame.get_pixel(100, 200), SMOKE_COLOUR);
}

#[test]
fn fire_label_and_status_banner() {
    let frame = gradient_frame();
    let mut processor = processor(FakeDetector::new(vec![raw(200, 150, 400, 300, 0, 0.7)]));

    let out = processor.process(&frame);

    assert_eq!(out.label, DominantLabel::Fire);
    // banner border in the top-left corner
    assert_eq!(out.frame.get_pixel(10, 10).0, [0, 0, 0]);
}

#[test]
fn detector_failure_falls_back_to_resized_frame() {
    let frame = gradient_frame();
    let mut processor = processor(FakeDetector::failing());

    let out = processor.process(&frame);

    assert_eq!(out.label, DominantLabel::NoDetection);
    assert_eq!(out.frame, resize_to_height(&frame, 360).unwrap());
    assert_eq!(processor.detector().calls, 1);
}

#[test]
fn unknown_class_id_falls_back_without_drawing() {
    let frame = gradient_frame();
    let mut processor = processor(FakeDetector::new(vec![
        raw(50, 100, 200, 250, 0, 0.9),
        raw(300, 100, 450, 250, 7, 0.8),
    ]));

    let out = processor.process(&frame);

    assert_eq!(out.label, DominantLabel::NoDetection);
    assert_eq!(out.frame, resize_to_height(&frame, 360).unwrap());
}

#[test]
fn detections_are_drawn_in_confidence_order() {
    let frame = gradient_frame();
    // same box twice, so the shared edge keeps the colour drawn last
    let mut processor = processor(FakeDetector::new(vec![
        raw(100, 150, 300, 300, 0, 0.6),
        raw(100, 150, 300, 300, 1, 0.9),
    ]));

    let out = processor.process(&frame);

    assert_eq!(out.label, DominantLabel::Smoke);
    assert_eq!(*out.frame.get_pixel(100, 250), FIRE_COLOUR);
    assert_eq!(*out.frame.get_pixel(300, 250), FIRE_COLOUR);
}

#[test]
fn oversized_box_is_clamped_into_frame() {
    let frame = gradient_frame();
    let mut processor = processor(FakeDetector::new(vec![raw(i32::MIN, 100, i32::MAX, i32::MAX, 0, 0.9)]));

    let out = processor.process(&frame);

    assert_eq!(out.label, DominantLabel::Fire);
    assert_eq!(out.frame.dimensions(), (640, 360));
    assert_eq!(*out.frame.get_pixel(0, 200), FIRE_COLOUR);
    assert_eq!(*out.frame.get_pixel(639, 200), FIRE_COLOUR);
}

#[test]
fn inverted_box_falls_back_without_drawing() {
    let frame = gradient_frame();
    let mut processor = processor(FakeDetector::new(vec![
        raw(50, 100, 200, 250, 0, 0.9),
        raw(300, 250, 100, 100, 1, 0.95),
    ]));

    let out = processor.process(&frame);

    assert_eq!(out.label, DominantLabel::NoDetection);
    assert_eq!(out.frame, resize_to_height(&frame, 360).unwrap());
}

#[test]
fn empty_frame_is_returned_as_is() {
    let frame = Frame::from(RgbImage::new(0, 0));
    let mut processor = processor(FakeDetector::new(vec![raw(0, 0, 10, 10, 0, 0.9)]));

    let out = processor.process(&frame);

    assert_eq!(out.label, DominantLabel::NoDetection);
    assert_eq!(out.frame, frame);
    assert_eq!(processor.detector().calls, 0);
}

#[test]
fn thresholds_come_from_config() {
    let config = DetectorConfig::new("unused.onnx")
        .with_target_height(360)
        .with_iou(0.45)
        .with_min_confidence(0.3)
        .with_smoke_confidence(0.55);
    let detector = FakeDetector::new(vec![raw(100, 100, 300, 300, 1, 0.6)]);
    let mut processor = FrameProcessor::new(detector, &config).with_annotator(Annotator::new(None, 24.));

    let out = processor.process(&gradient_frame());

    assert_eq!(out.label, DominantLabel::Smoke);
    assert_eq!(processor.detector().last_params, Some(InferenceParams::new(0.45, 0.3)));
}

#[test]
fn no_state_between_frames() {
    let frame = gradient_frame();
    let mut processor = processor(FakeDetector::new(vec![raw(200, 150, 400, 300, 0, 0.7)]));

    let first = processor.process(&frame);
    let second = processor.process(&frame);

    assert_eq!(first, second);
}
