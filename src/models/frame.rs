use std::sync::Arc;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// Pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDims {
    pub width: u32,
    pub height: u32,
}

impl FrameDims {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(&self) -> f64 {
        self.width as f64 * self.height as f64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// One camera tick. The image is shared, cloning a frame is cheap.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub image: Arc<DynamicImage>,
    pub width: u32,
    pub height: u32,
    pub timestamp: DateTime<Utc>,
}

impl CaptureFrame {
    pub fn new(image: DynamicImage, timestamp: DateTime<Utc>) -> Self {
        let (width, height) = (image.width(), image.height());
        Self {
            image: Arc::new(image),
            width,
            height,
            timestamp,
        }
    }

    pub fn dims(&self) -> FrameDims {
        FrameDims::new(self.width, self.height)
    }
}
