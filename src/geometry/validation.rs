use crate::error::ValidationWarning;
use crate::models::Dimensions;

const MAX_PLAUSIBLE_AXIS_CM: f64 = 150.0;
const MIN_PLAUSIBLE_AXIS_CM: f64 = 1.0;
const MAX_ASPECT_RATIO: f64 = 20.0;
const MAX_VOLUME_CM3: f64 = 1_000_000.0;

/// Advisory plausibility checks. An empty result means nothing looked odd.
pub fn validate_dimensions(dims: &Dimensions) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    for value in dims.axes() {
        if value > MAX_PLAUSIBLE_AXIS_CM {
            warnings.push(ValidationWarning::AxisTooLarge { value });
        } else if value < MIN_PLAUSIBLE_AXIS_CM {
            warnings.push(ValidationWarning::AxisTooSmall { value });
        }
    }

    let axes = dims.axes();
    let max = axes.iter().copied().fold(f64::MIN, f64::max);
    let min = axes.iter().copied().fold(f64::MAX, f64::min);
    if min > 0.0 && max / min > MAX_ASPECT_RATIO {
        warnings.push(ValidationWarning::ExtremeAspect { ratio: max / min });
    }

    let volume = dims.volume();
    if volume > MAX_VOLUME_CM3 {
        warnings.push(ValidationWarning::VolumeTooLarge { volume });
    }

    warnings
}
