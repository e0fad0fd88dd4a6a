use serde::{Deserialize, Serialize};

use crate::models::ResolutionPath;

use super::CaptureConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionTier {
    /// Accepted without confirmation; adjustment stays available.
    Auto,
    /// Confirmation skipped, adjustment opens directly.
    QuickAdjust,
    /// Retake, adjust or use as is.
    ManualReview,
}

impl ResolutionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionTier::Auto => "auto",
            ResolutionTier::QuickAdjust => "quickAdjust",
            ResolutionTier::ManualReview => "manualReview",
        }
    }

    pub fn path(&self) -> ResolutionPath {
        match self {
            ResolutionTier::Auto => ResolutionPath::Auto,
            ResolutionTier::QuickAdjust => ResolutionPath::QuickAdjust,
            ResolutionTier::ManualReview => ResolutionPath::Manual,
        }
    }
}

/// Raise the main-view confidence for each extra angle. The boost is capped
/// so it alone never pushes past `boost_cap`, and it never lowers a
/// confidence that was already above the cap.
pub fn boost_confidence(confidence: f64, extra_angles: usize, config: &CaptureConfig) -> f64 {
    let boost = (extra_angles as f64 * config.boost_per_angle).min(config.max_boost);
    let boosted = confidence + boost;
    let result = if boosted > config.boost_cap {
        confidence.max(config.boost_cap)
    } else {
        boosted
    };
    result.clamp(0.0, 1.0)
}

pub fn tier_for(confidence: f64, config: &CaptureConfig) -> ResolutionTier {
    if confidence > config.auto_threshold {
        ResolutionTier::Auto
    } else if confidence >= config.quick_adjust_threshold {
        ResolutionTier::QuickAdjust
    } else {
        ResolutionTier::ManualReview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn boost_scales_with_extra_angles() {
        let c = CaptureConfig::default();
        assert!(close(boost_confidence(0.70, 0, &c), 0.70));
        assert!(close(boost_confidence(0.70, 1, &c), 0.75));
        assert!(close(boost_confidence(0.70, 2, &c), 0.80));
        assert!(close(boost_confidence(0.70, 5, &c), 0.85));
    }

    #[test]
    fn boost_is_capped_but_never_lowers() {
        let c = CaptureConfig::default();
        assert!(close(boost_confidence(0.93, 1, &c), 0.95));
        assert!(close(boost_confidence(0.97, 0, &c), 0.97));
        assert!(close(boost_confidence(0.97, 2, &c), 0.97));
    }

    #[test]
    fn tiers_split_at_thresholds() {
        let c = CaptureConfig::default();
        assert_eq!(tier_for(0.97, &c), ResolutionTier::Auto);
        assert_eq!(tier_for(0.95, &c), ResolutionTier::QuickAdjust);
        assert_eq!(tier_for(0.90, &c), ResolutionTier::QuickAdjust);
        assert_eq!(tier_for(0.80, &c), ResolutionTier::ManualReview);
    }
}
