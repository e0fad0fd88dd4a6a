/// Inputs to the per-frame confidence score.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceInputs {
    /// Detector's own score for the box.
    pub detector_score: f64,
    pub coverage: f64,
    pub tilt: TiltState,
    pub reference_calibrated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiltState {
    Level,
    Tilted,
    Unknown,
}

/// Framing window that needs no penalty.
pub const IDEAL_COVERAGE: (f64, f64) = (0.4, 0.7);

const OFF_FRAME_FACTOR: f64 = 0.85;
const TILTED_FACTOR: f64 = 0.9;
const UNKNOWN_TILT_FACTOR: f64 = 0.95;
const REFERENCE_BONUS: f64 = 0.1;

pub fn frame_confidence(inputs: &ConfidenceInputs) -> f64 {
    let framing = if (IDEAL_COVERAGE.0..=IDEAL_COVERAGE.1).contains(&inputs.coverage) {
        1.0
    } else {
        OFF_FRAME_FACTOR
    };
    let tilt = match inputs.tilt {
        TiltState::Level => 1.0,
        TiltState::Tilted => TILTED_FACTOR,
        TiltState::Unknown => UNKNOWN_TILT_FACTOR,
    };
    let bonus = if inputs.reference_calibrated {
        REFERENCE_BONUS
    } else {
        0.0
    };
    (inputs.detector_score * framing * tilt + bonus).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_framed_level_shot_keeps_detector_score() {
        let score = frame_confidence(&ConfidenceInputs {
            detector_score: 0.8,
            coverage: 0.5,
            tilt: TiltState::Level,
            reference_calibrated: false,
        });
        assert!((score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn reference_bonus_is_clamped() {
        let score = frame_confidence(&ConfidenceInputs {
            detector_score: 0.98,
            coverage: 0.5,
            tilt: TiltState::Level,
            reference_calibrated: true,
        });
        assert_eq!(score, 1.0);
    }

    #[test]
    fn penalties_compound() {
        let score = frame_confidence(&ConfidenceInputs {
            detector_score: 1.0,
            coverage: 0.2,
            tilt: TiltState::Tilted,
            reference_calibrated: false,
        });
        assert!((score - 0.85 * 0.9).abs() < 1e-9);
    }
}
