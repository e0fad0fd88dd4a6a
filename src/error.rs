//! Error taxonomy for the measurement pipeline.
//!
//! Nothing here is fatal to the host. Detector failures never leave the
//! dispatcher; only [`MeasureError::CaptureFailed`] and
//! [`MeasureError::Cancelled`] are meant to interrupt the user.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MeasureError {
    /// The ML model could not be loaded; callers downgrade to edge detection.
    #[error("ml detection unavailable")]
    DetectionUnavailable,

    /// No candidate passed the detector filters.
    #[error("no object detected")]
    NoObjectDetected,

    /// Snapshot or per-angle estimation failed; earlier slots are kept.
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// No tilt sensor; tilt correction is skipped.
    #[error("tilt sensor unavailable")]
    SensorUnavailable,

    /// An event arrived that the current capture state does not accept.
    #[error("event {event} not accepted in state {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },

    #[error("measurement cancelled")]
    Cancelled,
}

pub type MeasureResult<T> = Result<T, MeasureError>;

/// Non-blocking advisory raised on implausible dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidationWarning {
    AxisTooLarge { value: f64 },
    AxisTooSmall { value: f64 },
    ExtremeAspect { ratio: f64 },
    VolumeTooLarge { volume: f64 },
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationWarning::AxisTooLarge { value } => {
                write!(f, "a dimension of {value:.1} cm looks too large")
            }
            ValidationWarning::AxisTooSmall { value } => {
                write!(f, "a dimension of {value:.1} cm looks too small")
            }
            ValidationWarning::ExtremeAspect { ratio } => {
                write!(f, "side ratio {ratio:.1} looks unusual")
            }
            ValidationWarning::VolumeTooLarge { volume } => {
                write!(f, "volume {volume:.0} cm³ looks too large")
            }
        }
    }
}
