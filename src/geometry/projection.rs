use crate::models::{BoundingBox, FrameDims};

use super::GeometryConfig;

/// Distance to the item from how much of the frame it fills.
///
/// Coverage 0.5 anchors at 40 cm; every 0.01 of coverage moves the estimate
/// by 1 cm, bounded to [20, 100] cm.
pub fn estimate_distance(bbox: &BoundingBox, frame: FrameDims, config: &GeometryConfig) -> f64 {
    if frame.is_empty() {
        return config.max_distance_cm;
    }
    let coverage =
        (bbox.width / frame.width as f64) * (bbox.height / frame.height as f64);
    let distance =
        config.anchor_distance_cm + (config.anchor_coverage - coverage) * config.distance_slope_cm;
    distance.clamp(config.min_distance_cm, config.max_distance_cm)
}

/// Similar-triangles projection of a pixel extent to centimetres.
pub fn pixel_to_real(
    pixel_size: f64,
    distance_cm: f64,
    frame_width_px: f64,
    sensor_width_mm: f64,
    focal_length_mm: f64,
) -> f64 {
    if frame_width_px <= 0.0 || focal_length_mm <= 0.0 {
        return 0.0;
    }
    let size_on_sensor_mm = pixel_size * (sensor_width_mm / frame_width_px);
    let distance_mm = distance_cm * 10.0;
    let real_mm = size_on_sensor_mm * distance_mm / focal_length_mm;
    real_mm / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_coverage_anchors_at_forty_cm() {
        let config = GeometryConfig::default();
        let frame = FrameDims::new(1000, 1000);
        let bbox = BoundingBox::new(0.0, 0.0, 1000.0, 500.0);
        let distance = estimate_distance(&bbox, frame, &config);
        assert!((distance - 40.0).abs() <= 1.0, "distance={distance}");
    }

    #[test]
    fn distance_is_bounded() {
        let config = GeometryConfig::default();
        let frame = FrameDims::new(1000, 1000);
        let tiny = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let full = BoundingBox::new(0.0, 0.0, 1000.0, 1000.0);
        assert!((estimate_distance(&tiny, frame, &config) - 89.99).abs() < 1e-9);
        assert_eq!(estimate_distance(&full, frame, &config), 20.0);

        let steep = GeometryConfig {
            distance_slope_cm: 200.0,
            ..GeometryConfig::default()
        };
        assert_eq!(estimate_distance(&tiny, frame, &steep), 100.0);
    }

    #[test]
    fn projection_scales_with_distance() {
        let near = pixel_to_real(500.0, 20.0, 1000.0, 4.8, 4.0);
        let far = pixel_to_real(500.0, 40.0, 1000.0, 4.8, 4.0);
        assert!((near - 12.0).abs() < 1e-9);
        assert!((far - 2.0 * near).abs() < 1e-9);
    }
}
