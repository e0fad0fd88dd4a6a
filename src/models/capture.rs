use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DimensionEstimate, Dimensions};

pub const MAX_ANGLE_SLOTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AngleTag {
    Main,
    Side,
}

impl AngleTag {
    pub fn for_slot(slot: usize) -> Self {
        if slot <= 1 {
            AngleTag::Main
        } else {
            AngleTag::Side
        }
    }
}

/// Encoded overlay photo. The JPEG bytes stay in memory for the host to
/// persist; only the metadata is serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedPhoto {
    pub image_ref: String,
    #[serde(skip)]
    pub jpeg: Vec<u8>,
    pub dimensions: Dimensions,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    pub angle_tag: AngleTag,
}

#[derive(Debug, Clone)]
pub struct AngleCapture {
    pub estimate: DimensionEstimate,
    pub photo: Option<CapturedPhoto>,
}

/// Up to three ordered captures; slot 1 is the main view.
#[derive(Debug, Clone, Default)]
pub struct MultiAngleCapture {
    slots: [Option<AngleCapture>; MAX_ANGLE_SLOTS],
}

impl MultiAngleCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a capture into 1-based `slot`. Returns `false` for an
    /// out-of-range slot.
    pub fn store(&mut self, slot: usize, capture: AngleCapture) -> bool {
        match slot.checked_sub(1).and_then(|idx| self.slots.get_mut(idx)) {
            Some(entry) => {
                *entry = Some(capture);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, slot: usize) -> Option<&AngleCapture> {
        slot.checked_sub(1)
            .and_then(|idx| self.slots.get(idx))
            .and_then(Option::as_ref)
    }

    pub fn main(&self) -> Option<&AngleCapture> {
        self.get(1)
    }

    pub fn filled(&self) -> impl Iterator<Item = &AngleCapture> {
        self.slots.iter().flatten()
    }

    pub fn filled_count(&self) -> usize {
        self.filled().count()
    }

    /// Number of side views beyond the main one.
    pub fn extra_angles(&self) -> usize {
        self.filled_count().saturating_sub(usize::from(self.main().is_some()))
    }

    pub fn photos(&self) -> Vec<CapturedPhoto> {
        self.filled().filter_map(|c| c.photo.clone()).collect()
    }

    /// Mean of all captured estimates.
    pub fn aggregate(&self) -> Option<DimensionEstimate> {
        let estimates: Vec<DimensionEstimate> = self.filled().map(|c| c.estimate).collect();
        crate::geometry::average_multi_frame(&estimates)
    }

    pub fn clear(&mut self) {
        self.slots = Default::default();
    }
}
