use crate::models::{
    BoundingBox, DimensionEstimate, Dimensions, FrameDims, ReferenceObject, TiltSample,
};

use super::{pixel_to_real, GeometryConfig};

/// Project the box to centimetres and infer the unseen height from the
/// footprint shape.
pub fn estimate_dimensions(
    bbox: &BoundingBox,
    frame: FrameDims,
    distance_cm: f64,
    config: &GeometryConfig,
) -> Dimensions {
    let frame_width = frame.width as f64;
    let width = pixel_to_real(
        bbox.width,
        distance_cm,
        frame_width,
        config.sensor_width_mm,
        config.focal_length_mm,
    );
    let length = pixel_to_real(
        bbox.height,
        distance_cm,
        frame_width,
        config.sensor_width_mm,
        config.focal_length_mm,
    );

    let ratio = if width > 0.0 { length / width } else { 0.0 };
    let height = if ratio > config.standing_ratio {
        0.8 * length
    } else if ratio < config.flat_ratio {
        0.3 * length
    } else {
        0.5 * width.min(length)
    };

    Dimensions::new(length, width, height).clamped()
}

fn tilt_factor(angle_deg: f64, config: &GeometryConfig) -> f64 {
    let angle = angle_deg.to_radians();
    if angle.abs() < config.tilt_dead_zone_rad {
        return 1.0;
    }
    let cos = angle.cos();
    if cos <= 0.0 {
        return config.max_tilt_correction;
    }
    (1.0 / cos).min(config.max_tilt_correction)
}

/// Undo foreshortening from a tilted phone. Pitch stretches length, roll
/// stretches width, height takes the larger of the two. User-adjusted
/// estimates pass through untouched.
pub fn correct_for_tilt(
    estimate: &DimensionEstimate,
    tilt: &TiltSample,
    config: &GeometryConfig,
) -> DimensionEstimate {
    if estimate.adjusted {
        return *estimate;
    }
    let pitch = tilt_factor(tilt.pitch, config);
    let roll = tilt_factor(tilt.roll, config);
    let dims = estimate.dimensions;
    let corrected = Dimensions::new(
        dims.length * pitch,
        dims.width * roll,
        dims.height * pitch.max(roll),
    );
    DimensionEstimate {
        dimensions: corrected.clamped(),
        ..*estimate
    }
}

/// Rescale every axis by the reference's known/measured ratio. Identity
/// while the reference is unmeasured or the estimate was user-adjusted.
pub fn calibrate_with_reference(
    estimate: &DimensionEstimate,
    reference: Option<&ReferenceObject>,
) -> DimensionEstimate {
    if estimate.adjusted {
        return *estimate;
    }
    let Some(ratio) = reference.and_then(ReferenceObject::scale_ratio) else {
        return *estimate;
    };
    DimensionEstimate {
        dimensions: estimate.dimensions.scaled(ratio).clamped(),
        ..*estimate
    }
}

/// Per-axis mean of several estimates. Confidence gets a small agreement
/// bonus but never exceeds 0.9.
pub fn average_multi_frame(estimates: &[DimensionEstimate]) -> Option<DimensionEstimate> {
    if estimates.is_empty() {
        return None;
    }
    let n = estimates.len() as f64;
    let mean = |f: &dyn Fn(&DimensionEstimate) -> f64| estimates.iter().map(f).sum::<f64>() / n;

    let dimensions = Dimensions::new(
        mean(&|e| e.dimensions.length),
        mean(&|e| e.dimensions.width),
        mean(&|e| e.dimensions.height),
    );
    let source = BoundingBox::new(
        mean(&|e| e.source.x),
        mean(&|e| e.source.y),
        mean(&|e| e.source.width),
        mean(&|e| e.source.height),
    );
    let confidence = (mean(&|e| e.confidence) * 1.1).min(0.9);

    Some(DimensionEstimate::new(dimensions, confidence, source))
}
