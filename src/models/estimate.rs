use serde::{Deserialize, Serialize};

use super::BoundingBox;

pub const MIN_DIMENSION_CM: f64 = 1.0;
pub const MAX_DIMENSION_CM: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub const fn new(length: f64, width: f64, height: f64) -> Self {
        Self {
            length,
            width,
            height,
        }
    }

    pub fn clamped(&self) -> Self {
        Self::new(clamp_cm(self.length), clamp_cm(self.width), clamp_cm(self.height))
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.length * factor, self.width * factor, self.height * factor)
    }

    pub fn axes(&self) -> [f64; 3] {
        [self.length, self.width, self.height]
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Length => self.length,
            Axis::Width => self.width,
            Axis::Height => self.height,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::Length => self.length = value,
            Axis::Width => self.width = value,
            Axis::Height => self.height = value,
        }
    }

    /// Largest per-axis absolute difference.
    pub fn max_axis_delta(&self, other: &Dimensions) -> f64 {
        (self.length - other.length)
            .abs()
            .max((self.width - other.width).abs())
            .max((self.height - other.height).abs())
    }

    pub fn volume(&self) -> f64 {
        self.length * self.width * self.height
    }
}

/// Clamp a value into the supported measurement range. Non-finite input maps
/// to the minimum.
pub fn clamp_cm(value: f64) -> f64 {
    if !value.is_finite() {
        return MIN_DIMENSION_CM;
    }
    value.clamp(MIN_DIMENSION_CM, MAX_DIMENSION_CM)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Axis {
    Length,
    Width,
    Height,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionEstimate {
    pub dimensions: Dimensions,
    pub confidence: f64,
    pub source: BoundingBox,
    /// Set once the user edits the values; automatic corrections skip
    /// adjusted estimates.
    #[serde(default)]
    pub adjusted: bool,
}

impl DimensionEstimate {
    pub fn new(dimensions: Dimensions, confidence: f64, source: BoundingBox) -> Self {
        Self {
            dimensions: dimensions.clamped(),
            confidence: confidence.clamp(0.0, 1.0),
            source,
            adjusted: false,
        }
    }
}
