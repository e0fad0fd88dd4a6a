mod common;

use common::{frame, striped_block, with_noise};
use dimscan::detection::{DetectionDispatcher, EdgeDetector, ObjectDetector};
use dimscan::models::DetectorKind;

fn assert_near(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{actual} not within {tolerance} of {expected}"
    );
}

#[test]
fn block_on_sensor_noise_is_found() {
    let img = with_noise(striped_block(200, 50, 50, 100, 2, 60), 10, 7);
    let outcome = EdgeDetector::default().detect(&frame(img)).unwrap();
    let primary = outcome.primary.expect("block should survive noise");

    assert_near(primary.bbox.x, 50.0, 4.0);
    assert_near(primary.bbox.y, 50.0, 4.0);
    assert_near(primary.bbox.width, 100.0, 8.0);
    assert_near(primary.bbox.height, 100.0, 8.0);
    assert!(primary.score > 0.9);
}

#[test]
fn large_frames_map_back_to_frame_pixels() {
    let img = striped_block(800, 240, 240, 320, 4, 0);
    let outcome = EdgeDetector::default().detect(&frame(img)).unwrap();
    let b = outcome.primary.expect("block should be detected").bbox;

    assert_near(b.x, 240.0, 10.0);
    assert_near(b.y, 240.0, 10.0);
    assert_near(b.width, 320.0, 20.0);
    assert_near(b.height, 320.0, 20.0);
    assert!(b.x + b.width <= 800.0 && b.y + b.height <= 800.0);
}

#[test]
fn same_frame_same_answer() {
    let f = frame(with_noise(striped_block(160, 40, 40, 80, 2, 30), 6, 11));
    let detector = EdgeDetector::default();
    let first = detector.detect(&f).unwrap();
    let second = detector.detect(&f).unwrap();
    assert_eq!(first.primary, second.primary);
    assert_eq!(first.candidates, second.candidates);
}

#[tokio::test]
async fn unclassified_dispatcher_uses_edges() {
    let dispatcher = DetectionDispatcher::edge_only();
    let outcome = dispatcher
        .detect(&frame(striped_block(200, 60, 60, 80, 2, 0)))
        .await;
    assert_eq!(outcome.detector, DetectorKind::Edge);
    assert!(outcome.primary.is_some());
}
