use std::time::Duration;

/// Tunables for positioning, countdown, multi-angle and resolution.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Confidence a reading needs before the countdown may arm.
    pub ready_confidence: f64,
    /// Coverage window that counts as well framed.
    pub ideal_coverage: (f64, f64),
    /// Below this coverage the hint is "move closer".
    pub move_closer_coverage: f64,
    /// Above this coverage the hint is "move back".
    pub move_back_coverage: f64,
    /// Below this confidence the hint is "hold steady".
    pub hold_steady_confidence: f64,
    /// Largest per-axis drift, in cm, that still counts as the same reading.
    pub stability_tolerance_cm: f64,
    pub stability_required: Duration,
    pub stability_cap: Duration,
    pub countdown_ticks: u32,
    pub countdown_interval: Duration,
    pub nudge_step_cm: f64,
    pub max_slots: usize,
    pub boost_per_angle: f64,
    pub max_boost: f64,
    pub boost_cap: f64,
    /// Strictly above this confidence a result resolves automatically.
    pub auto_threshold: f64,
    /// At or above this confidence the adjustment view opens directly.
    pub quick_adjust_threshold: f64,
    /// Live estimates kept for the smoothed display value.
    pub smoothing_window: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ready_confidence: 0.75,
            ideal_coverage: (0.4, 0.7),
            move_closer_coverage: 0.3,
            move_back_coverage: 0.75,
            hold_steady_confidence: 0.5,
            stability_tolerance_cm: 2.0,
            stability_required: Duration::from_millis(1500),
            stability_cap: Duration::from_secs(3),
            countdown_ticks: 3,
            countdown_interval: Duration::from_secs(1),
            nudge_step_cm: 0.5,
            max_slots: crate::models::MAX_ANGLE_SLOTS,
            boost_per_angle: 0.05,
            max_boost: 0.15,
            boost_cap: 0.95,
            auto_threshold: 0.95,
            quick_adjust_threshold: 0.90,
            smoothing_window: 5,
        }
    }
}
