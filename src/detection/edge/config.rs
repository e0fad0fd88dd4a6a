/// Tunables for the contour detector.
#[derive(Debug, Clone)]
pub struct EdgeDetectorConfig {
    /// Longest side the frame is downscaled to before processing.
    pub max_dimension: u32,

    /// Strong edge threshold as a fraction of the peak gradient magnitude.
    pub high_threshold_ratio: f32,
    /// Weak edge threshold as a fraction of the peak gradient magnitude.
    pub low_threshold_ratio: f32,

    pub min_component_pixels: usize,
    /// Minimum component size as a fraction of all pixels.
    pub min_component_fraction: f64,
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    /// Components at or below this fill ratio are hollow and rejected.
    pub min_fill_ratio: f64,

    pub margin_fraction: f64,
    pub margin_bonus: f64,
    pub aspect_bonus_range: (f64, f64),
    pub aspect_bonus: f64,
    pub dense_fill_ratio: f64,
    pub dense_bonus: f64,
}

impl Default for EdgeDetectorConfig {
    fn default() -> Self {
        Self {
            max_dimension: 400,
            high_threshold_ratio: 0.3,
            low_threshold_ratio: 0.1,
            min_component_pixels: 50,
            min_component_fraction: 0.001,
            min_aspect_ratio: 0.2,
            max_aspect_ratio: 5.0,
            min_fill_ratio: 0.3,
            margin_fraction: 0.08,
            margin_bonus: 1.5,
            aspect_bonus_range: (0.5, 2.0),
            aspect_bonus: 1.2,
            dense_fill_ratio: 0.5,
            dense_bonus: 1.3,
        }
    }
}
