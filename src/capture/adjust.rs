//! User corrections to a resolved estimate.

use serde::{Deserialize, Serialize};

use crate::models::{clamp_cm, Axis, DimensionEstimate, Dimensions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NudgeDirection {
    Increase,
    Decrease,
}

/// Move one axis by `step` cm, staying inside the supported range.
pub fn nudge(
    estimate: &DimensionEstimate,
    axis: Axis,
    direction: NudgeDirection,
    step: f64,
) -> DimensionEstimate {
    let delta = match direction {
        NudgeDirection::Increase => step,
        NudgeDirection::Decrease => -step,
    };
    let mut dimensions = estimate.dimensions;
    dimensions.set(axis, clamp_cm(dimensions.get(axis) + delta));
    DimensionEstimate {
        dimensions,
        adjusted: true,
        ..*estimate
    }
}

pub fn set_dimensions(estimate: &DimensionEstimate, dimensions: Dimensions) -> DimensionEstimate {
    DimensionEstimate {
        dimensions: dimensions.clamped(),
        adjusted: true,
        ..*estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    fn estimate(length: f64) -> DimensionEstimate {
        DimensionEstimate::new(
            Dimensions::new(length, 10.0, 5.0),
            0.8,
            BoundingBox::new(0.0, 0.0, 1.0, 1.0),
        )
    }

    #[test]
    fn nudges_are_clamped_and_mark_adjusted() {
        let up = nudge(&estimate(199.8), Axis::Length, NudgeDirection::Increase, 0.5);
        assert_eq!(up.dimensions.length, 200.0);
        assert!(up.adjusted);

        let down = nudge(&estimate(1.2), Axis::Length, NudgeDirection::Decrease, 0.5);
        assert_eq!(down.dimensions.length, 1.0);

        let width = nudge(&estimate(20.0), Axis::Width, NudgeDirection::Decrease, 0.5);
        assert_eq!(width.dimensions.width, 9.5);
        assert_eq!(width.dimensions.length, 20.0);
    }

    #[test]
    fn set_dimensions_clamps() {
        let set = set_dimensions(&estimate(20.0), Dimensions::new(300.0, 0.2, 12.0));
        assert_eq!(set.dimensions, Dimensions::new(200.0, 1.0, 12.0));
        assert!(set.adjusted);
    }
}
