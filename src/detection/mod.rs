//! Object localisation.
//!
//! Two detectors sit behind [`ObjectDetector`]: the contour-based
//! [`EdgeDetector`] that always works, and the optional [`MlDetector`] whose
//! model is loaded lazily through a [`ModelSlot`]. The
//! [`DetectionDispatcher`] picks one per frame and absorbs every failure.

pub mod dispatcher;
pub mod edge;
pub mod ml;

pub use dispatcher::DetectionDispatcher;
pub use edge::{EdgeDetector, EdgeDetectorConfig};
pub use ml::{MlDetector, MlDetectorConfig, ModelLoader, ModelSlot, ObjectModel, RawDetection};

use anyhow::Result;

use crate::models::{BoundingBox, CaptureFrame, DetectorKind};

/// A located object plus the detector's own trust in it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutcome {
    pub detector: DetectorKind,
    /// The most prominent object, if any.
    pub primary: Option<Detection>,
    /// Every box that passed the detector's filters, best first. Includes
    /// the primary box.
    pub candidates: Vec<BoundingBox>,
}

impl DetectionOutcome {
    pub fn empty(detector: DetectorKind) -> Self {
        Self {
            detector,
            primary: None,
            candidates: Vec::new(),
        }
    }

    /// Candidates other than the primary box.
    pub fn secondary_candidates(&self) -> Vec<BoundingBox> {
        let primary = self.primary.map(|d| d.bbox);
        self.candidates
            .iter()
            .filter(|b| Some(**b) != primary)
            .copied()
            .collect()
    }
}

pub trait ObjectDetector: Send + Sync {
    fn kind(&self) -> DetectorKind;

    /// Locate the single most prominent object. Boxes are in frame pixels
    /// and lie fully inside the frame.
    fn detect(&self, frame: &CaptureFrame) -> Result<DetectionOutcome>;
}
