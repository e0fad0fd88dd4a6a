use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    DeviceCapabilityProfile, DimensionEstimate, MultiAngleCapture, ReferenceObject, TiltSample,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DetectorKind {
    Edge,
    Ml,
}

impl DetectorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorKind::Edge => "edge",
            DetectorKind::Ml => "ml",
        }
    }
}

/// How the final estimate was settled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionPath {
    Auto,
    QuickAdjust,
    Manual,
}

impl ResolutionPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionPath::Auto => "auto",
            ResolutionPath::QuickAdjust => "quick-adjust",
            ResolutionPath::Manual => "manual",
        }
    }
}

/// Everything collected while the capture UI is open. Dropped on accept,
/// cancel or error.
#[derive(Debug, Clone)]
pub struct MeasurementSession {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub profile: DeviceCapabilityProfile,
    pub detector: DetectorKind,
    pub tilt_samples: Vec<TiltSample>,
    pub reference: Option<ReferenceObject>,
    pub captures: MultiAngleCapture,
    pub final_estimate: Option<DimensionEstimate>,
    pub resolution: Option<ResolutionPath>,
}

impl MeasurementSession {
    pub fn new(
        id: String,
        created_at: DateTime<Utc>,
        profile: DeviceCapabilityProfile,
        detector: DetectorKind,
    ) -> Self {
        Self {
            id,
            created_at,
            profile,
            detector,
            tilt_samples: Vec::new(),
            reference: None,
            captures: MultiAngleCapture::new(),
            final_estimate: None,
            resolution: None,
        }
    }
}
