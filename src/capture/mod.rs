//! Capture orchestration: positioning, countdown, multi-angle capture,
//! resolution and finalization.
//!
//! [`CaptureMachine`] holds every rule and is synchronous. The
//! [`CaptureController`] drives it from camera frames, timers and UI calls.

pub mod adjust;
pub mod config;
pub mod controller;
pub mod finalize;
pub mod photo;
pub mod pipeline;
pub mod positioning;
pub mod resolution;
pub mod state;

pub use adjust::NudgeDirection;
pub use config::CaptureConfig;
pub use controller::{CameraSource, CaptureController, CaptureNotice};
pub use finalize::{MeasurementResult, WholeDimensions};
pub use pipeline::{FrameAnalysis, FramePipeline};
pub use positioning::{is_ready, positioning_hint, PositioningHint, PositioningTracker};
pub use resolution::{boost_confidence, tier_for, ResolutionTier};
pub use state::{CaptureEvent, CaptureMachine, CaptureState, Effect, Reading};
