/// Camera model and correction constants.
///
/// The sensor and focal defaults are empirical placeholders for a typical
/// phone main camera, not calibrated values. Expect 20-30% error.
#[derive(Debug, Clone)]
pub struct GeometryConfig {
    pub sensor_width_mm: f64,
    pub focal_length_mm: f64,

    /// Coverage that maps to `anchor_distance_cm`.
    pub anchor_coverage: f64,
    pub anchor_distance_cm: f64,
    /// Centimetres of distance per unit of coverage away from the anchor.
    pub distance_slope_cm: f64,
    pub min_distance_cm: f64,
    pub max_distance_cm: f64,

    /// Tilt below this angle (radians) is treated as level.
    pub tilt_dead_zone_rad: f64,
    /// Upper bound on any single tilt correction factor.
    pub max_tilt_correction: f64,

    /// Length/width above this reads as a standing item.
    pub standing_ratio: f64,
    /// Length/width below this reads as a flat item.
    pub flat_ratio: f64,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            sensor_width_mm: 4.8,
            focal_length_mm: 4.0,
            anchor_coverage: 0.5,
            anchor_distance_cm: 40.0,
            distance_slope_cm: 100.0,
            min_distance_cm: 20.0,
            max_distance_cm: 100.0,
            tilt_dead_zone_rad: 0.1,
            max_tilt_correction: 1.5,
            standing_ratio: 1.5,
            flat_ratio: 0.7,
        }
    }
}
