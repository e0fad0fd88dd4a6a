use serde::{Deserialize, Serialize};

/// Device orientation in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TiltSample {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

impl TiltSample {
    pub const LEVEL: TiltSample = TiltSample {
        pitch: 0.0,
        roll: 0.0,
        yaw: 0.0,
    };

    pub const fn new(pitch: f64, roll: f64, yaw: f64) -> Self {
        Self { pitch, roll, yaw }
    }
}
