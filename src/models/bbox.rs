use serde::{Deserialize, Serialize};

use super::FrameDims;

/// Axis-aligned pixel rectangle. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Width over height; zero for a degenerate box.
    pub fn aspect_ratio(&self) -> f64 {
        if self.height <= 0.0 {
            return 0.0;
        }
        self.width / self.height
    }

    /// Ratio of the box area to the frame area.
    pub fn coverage(&self, frame: FrameDims) -> f64 {
        let frame_area = frame.area();
        if frame_area <= 0.0 {
            return 0.0;
        }
        self.area() / frame_area
    }

    pub fn is_within(&self, frame: FrameDims) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.right() <= frame.width as f64
            && self.bottom() <= frame.height as f64
    }

    /// Intersect with the frame rectangle so the box never leaves frame bounds.
    pub fn clamp_to(&self, frame: FrameDims) -> Self {
        let fw = frame.width as f64;
        let fh = frame.height as f64;
        let x0 = self.x.clamp(0.0, fw);
        let y0 = self.y.clamp(0.0, fh);
        let x1 = self.right().clamp(x0, fw);
        let y1 = self.bottom().clamp(y0, fh);
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(
            self.x * factor,
            self.y * factor,
            self.width * factor,
            self.height * factor,
        )
    }

    /// `true` when every side keeps at least `fraction` of the frame as margin.
    pub fn keeps_margin(&self, frame: FrameDims, fraction: f64) -> bool {
        let mx = frame.width as f64 * fraction;
        let my = frame.height as f64 * fraction;
        self.x >= mx
            && self.y >= my
            && self.right() <= frame.width as f64 - mx
            && self.bottom() <= frame.height as f64 - my
    }
}
