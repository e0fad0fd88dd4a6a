//! Pixel to real-world conversion.
//!
//! The camera model is coarse: distance comes from frame
//! coverage, size from a pinhole projection with fixed sensor constants.

pub mod config;
pub mod confidence;
pub mod dimensions;
pub mod projection;
pub mod reference;
pub mod validation;

pub use config::GeometryConfig;
pub use confidence::{frame_confidence, ConfidenceInputs, TiltState, IDEAL_COVERAGE};
pub use dimensions::{
    average_multi_frame, calibrate_with_reference, correct_for_tilt, estimate_dimensions,
};
pub use projection::{estimate_distance, pixel_to_real};
pub use reference::detect_reference_object;
pub use validation::validate_dimensions;

use crate::models::{
    BoundingBox, DimensionEstimate, Dimensions, FrameDims, ReferenceObject, TiltSample,
};

/// Geometry operations bound to one camera configuration.
#[derive(Debug, Clone, Default)]
pub struct GeometryEngine {
    config: GeometryConfig,
}

impl GeometryEngine {
    pub fn new(config: GeometryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeometryConfig {
        &self.config
    }

    pub fn estimate_distance(&self, bbox: &BoundingBox, frame: FrameDims) -> f64 {
        estimate_distance(bbox, frame, &self.config)
    }

    /// Project a pixel extent at `distance_cm` with the configured camera.
    pub fn pixel_to_real(&self, pixel_size: f64, distance_cm: f64, frame_width_px: f64) -> f64 {
        pixel_to_real(
            pixel_size,
            distance_cm,
            frame_width_px,
            self.config.sensor_width_mm,
            self.config.focal_length_mm,
        )
    }

    pub fn estimate_dimensions(
        &self,
        bbox: &BoundingBox,
        frame: FrameDims,
        distance_cm: f64,
    ) -> Dimensions {
        estimate_dimensions(bbox, frame, distance_cm, &self.config)
    }

    pub fn correct_for_tilt(
        &self,
        estimate: &DimensionEstimate,
        tilt: &TiltSample,
    ) -> DimensionEstimate {
        correct_for_tilt(estimate, tilt, &self.config)
    }

    pub fn calibrate_with_reference(
        &self,
        estimate: &DimensionEstimate,
        reference: Option<&ReferenceObject>,
    ) -> DimensionEstimate {
        calibrate_with_reference(estimate, reference)
    }

    /// Fill in how large the reference measured at `distance_cm`.
    pub fn measure_reference(
        &self,
        reference: ReferenceObject,
        frame: FrameDims,
        distance_cm: f64,
    ) -> ReferenceObject {
        let long_side = reference.bbox.width.max(reference.bbox.height);
        let size = self.pixel_to_real(long_side, distance_cm, frame.width as f64);
        reference.with_detected_size(size)
    }

    /// True when either angle is outside the level dead zone.
    pub fn is_tilted(&self, tilt: &TiltSample) -> bool {
        tilt.pitch.to_radians().abs() >= self.config.tilt_dead_zone_rad
            || tilt.roll.to_radians().abs() >= self.config.tilt_dead_zone_rad
    }
}
