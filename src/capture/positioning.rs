use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::models::Dimensions;

use super::CaptureConfig;

/// Framing guidance shown while the user lines up the shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PositioningHint {
    MoveCloser,
    MoveBack,
    HoldSteady,
    Perfect,
    Good,
}

impl PositioningHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositioningHint::MoveCloser => "move closer",
            PositioningHint::MoveBack => "move back",
            PositioningHint::HoldSteady => "hold steady",
            PositioningHint::Perfect => "perfect",
            PositioningHint::Good => "good",
        }
    }
}

fn in_window(coverage: f64, window: (f64, f64)) -> bool {
    (window.0..=window.1).contains(&coverage)
}

/// First matching rule wins: framing problems before steadiness.
pub fn positioning_hint(coverage: f64, confidence: f64, config: &CaptureConfig) -> PositioningHint {
    if coverage < config.move_closer_coverage {
        PositioningHint::MoveCloser
    } else if coverage > config.move_back_coverage {
        PositioningHint::MoveBack
    } else if confidence < config.hold_steady_confidence {
        PositioningHint::HoldSteady
    } else if confidence > config.ready_confidence && in_window(coverage, config.ideal_coverage) {
        PositioningHint::Perfect
    } else {
        PositioningHint::Good
    }
}

pub fn is_ready(confidence: f64, coverage: f64, stable: bool, config: &CaptureConfig) -> bool {
    confidence > config.ready_confidence && in_window(coverage, config.ideal_coverage) && stable
}

/// Stability timer over successive readings.
///
/// The first reading becomes the anchor. Any later reading that drifts more
/// than the tolerance from the anchor on some axis re-anchors and zeroes the
/// timer, so slow cumulative drift also counts as movement.
#[derive(Debug, Clone, Default)]
pub struct PositioningTracker {
    anchor: Option<Dimensions>,
    last_at: Option<Instant>,
    stable_for: Duration,
}

impl PositioningTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, dims: Dimensions, at: Instant, config: &CaptureConfig) -> Duration {
        match (self.anchor, self.last_at) {
            (Some(anchor), Some(last_at)) if anchor.max_axis_delta(&dims) <= config.stability_tolerance_cm => {
                let dt = at.saturating_duration_since(last_at);
                self.stable_for = (self.stable_for + dt).min(config.stability_cap);
            }
            _ => {
                self.anchor = Some(dims);
                self.stable_for = Duration::ZERO;
            }
        }
        self.last_at = Some(at);
        self.stable_for
    }

    pub fn stable_for(&self) -> Duration {
        self.stable_for
    }

    pub fn is_stable(&self, config: &CaptureConfig) -> bool {
        self.stable_for >= config.stability_required
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
