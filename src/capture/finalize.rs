use serde::{Deserialize, Serialize};

use crate::models::{CapturedPhoto, DimensionEstimate, Dimensions};
use crate::settings::PhotoSaveMode;

/// Dimensions rounded to whole centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WholeDimensions {
    pub length: u32,
    pub width: u32,
    pub height: u32,
}

impl From<Dimensions> for WholeDimensions {
    fn from(dims: Dimensions) -> Self {
        let round = |v: f64| crate::models::clamp_cm(v).round() as u32;
        Self {
            length: round(dims.length),
            width: round(dims.width),
            height: round(dims.height),
        }
    }
}

/// What the host receives when a session completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementResult {
    pub dimensions: WholeDimensions,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub photos: Option<Vec<CapturedPhoto>>,
}

/// Decide whether photos go out with the result. `answer` is the user's
/// reply to the save prompt and only matters in [`PhotoSaveMode::Ask`].
pub fn include_photos(mode: PhotoSaveMode, answer: Option<bool>) -> bool {
    match mode {
        PhotoSaveMode::Always => true,
        PhotoSaveMode::Never => false,
        PhotoSaveMode::Ask => answer.unwrap_or(false),
    }
}

pub fn finalize(
    estimate: &DimensionEstimate,
    photos: Vec<CapturedPhoto>,
    mode: PhotoSaveMode,
    answer: Option<bool>,
) -> MeasurementResult {
    let photos = (include_photos(mode, answer) && !photos.is_empty()).then_some(photos);
    MeasurementResult {
        dimensions: estimate.dimensions.into(),
        confidence: estimate.confidence,
        photos,
    }
}
