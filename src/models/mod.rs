mod bbox;
mod capture;
mod estimate;
mod frame;
mod profile;
mod reference;
mod session;
mod tilt;

pub use bbox::BoundingBox;
pub use capture::{AngleCapture, AngleTag, CapturedPhoto, MultiAngleCapture, MAX_ANGLE_SLOTS};
pub use estimate::{
    clamp_cm, Axis, DimensionEstimate, Dimensions, MAX_DIMENSION_CM, MIN_DIMENSION_CM,
};
pub use frame::{CaptureFrame, FrameDims};
pub use profile::{DetectionTier, DeviceCapabilityProfile};
pub use reference::{ReferenceClass, ReferenceObject};
pub use session::{DetectorKind, MeasurementSession, ResolutionPath};
pub use tilt::TiltSample;
