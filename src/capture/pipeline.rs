use std::collections::VecDeque;

use crate::detection::DetectionOutcome;
use crate::geometry::{
    average_multi_frame, detect_reference_object, frame_confidence, ConfidenceInputs,
    GeometryEngine, TiltState,
};
use crate::models::{BoundingBox, DimensionEstimate, FrameDims, ReferenceObject, TiltSample};

/// Per-frame geometry for one detected box.
#[derive(Debug, Clone, Copy)]
pub struct FrameAnalysis {
    pub bbox: BoundingBox,
    pub coverage: f64,
    pub distance_cm: f64,
    pub estimate: DimensionEstimate,
    pub reference: Option<ReferenceObject>,
}

/// Turns detections into dimension estimates and keeps a short window of
/// live results for display smoothing.
#[derive(Debug, Clone)]
pub struct FramePipeline {
    geometry: GeometryEngine,
    recent: VecDeque<DimensionEstimate>,
    window: usize,
}

impl FramePipeline {
    pub fn new(geometry: GeometryEngine, window: usize) -> Self {
        let window = window.max(1);
        Self {
            geometry,
            recent: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn geometry(&self) -> &GeometryEngine {
        &self.geometry
    }

    /// Analyse a live detection and remember it for smoothing. `None` when the
    /// detector found nothing.
    pub fn analyze(
        &mut self,
        outcome: &DetectionOutcome,
        frame: FrameDims,
        tilt: Option<TiltSample>,
    ) -> Option<FrameAnalysis> {
        let primary = outcome.primary?;
        let analysis = self.estimate_box(
            primary.bbox,
            primary.score,
            &outcome.secondary_candidates(),
            frame,
            tilt,
        );
        if self.recent.len() == self.window {
            self.recent.pop_front();
        }
        self.recent.push_back(analysis.estimate);
        Some(analysis)
    }

    /// Estimate dimensions for `bbox`. `others` are further candidate boxes
    /// searched for a calibration reference.
    pub fn estimate_box(
        &self,
        bbox: BoundingBox,
        detector_score: f64,
        others: &[BoundingBox],
        frame: FrameDims,
        tilt: Option<TiltSample>,
    ) -> FrameAnalysis {
        let geometry = &self.geometry;
        let coverage = bbox.coverage(frame);
        let distance_cm = geometry.estimate_distance(&bbox, frame);
        let dimensions = geometry.estimate_dimensions(&bbox, frame, distance_cm);

        let reference = detect_reference_object(others, frame)
            .map(|found| geometry.measure_reference(found, frame, distance_cm));

        let mut estimate = DimensionEstimate::new(dimensions, 0.0, bbox);
        if let Some(tilt) = tilt.as_ref() {
            estimate = geometry.correct_for_tilt(&estimate, tilt);
        }
        estimate = geometry.calibrate_with_reference(&estimate, reference.as_ref());

        let tilt_state = match tilt {
            None => TiltState::Unknown,
            Some(t) if geometry.is_tilted(&t) => TiltState::Tilted,
            Some(_) => TiltState::Level,
        };
        estimate.confidence = frame_confidence(&ConfidenceInputs {
            detector_score,
            coverage,
            tilt: tilt_state,
            reference_calibrated: reference
                .as_ref()
                .and_then(ReferenceObject::scale_ratio)
                .is_some(),
        });

        FrameAnalysis {
            bbox,
            coverage,
            distance_cm,
            estimate,
            reference,
        }
    }

    /// Mean of the recent live estimates.
    pub fn smoothed(&self) -> Option<DimensionEstimate> {
        let recent: Vec<DimensionEstimate> = self.recent.iter().copied().collect();
        average_multi_frame(&recent)
    }

    pub fn reset(&mut self) {
        self.recent.clear();
    }
}
