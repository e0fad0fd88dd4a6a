use serde::{Deserialize, Serialize};

use super::BoundingBox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceClass {
    Coin,
    CreditCard,
    Paper,
}

impl ReferenceClass {
    /// Longest side of the physical object, in cm.
    pub fn known_size_cm(&self) -> f64 {
        match self {
            ReferenceClass::Coin => 2.4,
            ReferenceClass::CreditCard => 8.56,
            ReferenceClass::Paper => 29.7,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceClass::Coin => "coin",
            ReferenceClass::CreditCard => "credit_card",
            ReferenceClass::Paper => "paper",
        }
    }
}

/// Object of known size found next to the item.
///
/// `detected_size` is the extent the geometry engine measured for the
/// reference in the same frame, so `known_size_cm / detected_size` is the
/// scale error of that frame. `None` until a measurement exists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceObject {
    pub class: ReferenceClass,
    pub known_size_cm: f64,
    pub detected_size: Option<f64>,
    pub bbox: BoundingBox,
}

impl ReferenceObject {
    pub fn new(class: ReferenceClass, bbox: BoundingBox) -> Self {
        Self {
            class,
            known_size_cm: class.known_size_cm(),
            detected_size: None,
            bbox,
        }
    }

    pub fn with_detected_size(mut self, size: f64) -> Self {
        self.detected_size = Some(size);
        self
    }

    /// Correction factor, or `None` while the reference is unmeasured.
    pub fn scale_ratio(&self) -> Option<f64> {
        match self.detected_size {
            Some(size) if size > 0.0 && size.is_finite() => Some(self.known_size_cm / size),
            _ => None,
        }
    }
}
