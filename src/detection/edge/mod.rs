//! Model-free object localisation from gradient contours.
//!
//! Pipeline: downscale (longest side ≤ 400) → luma → 3×3 Gaussian → Sobel
//! magnitude → hysteresis → connected components → shape filters → score.
//! Deterministic for a given frame.

pub mod components;
pub mod config;
pub mod filters;
pub mod hysteresis;

pub use components::{connected_components, Component};
pub use config::EdgeDetectorConfig;

use anyhow::Result;
use image::imageops::FilterType;
use log::debug;

use crate::models::{BoundingBox, CaptureFrame, DetectorKind, FrameDims};
use crate::raster::LumaBuffer;

use super::{Detection, DetectionOutcome, ObjectDetector};

const BASE_CONFIDENCE: f64 = 0.55;
const FILL_CONFIDENCE_WEIGHT: f64 = 0.4;

#[derive(Debug, Clone)]
struct ScoredComponent {
    component: Component,
    score: f64,
}

#[derive(Debug, Clone, Default)]
pub struct EdgeDetector {
    config: EdgeDetectorConfig,
}

impl EdgeDetector {
    pub fn new(config: EdgeDetectorConfig) -> Self {
        Self { config }
    }

    /// Downscale into a luma buffer. Returns the buffer plus the x/y factors
    /// that map buffer pixels back to frame pixels.
    fn prepare(&self, frame: &CaptureFrame) -> (LumaBuffer, f64, f64) {
        let (w, h) = (frame.width.max(1), frame.height.max(1));
        let limit = self.config.max_dimension.max(1) as f64;
        let scale = (limit / w as f64).min(limit / h as f64).min(1.0);

        let rgb = if scale < 1.0 {
            let nw = ((w as f64 * scale).round() as u32).max(1);
            let nh = ((h as f64 * scale).round() as u32).max(1);
            frame.image.resize_exact(nw, nh, FilterType::Triangle).to_rgb8()
        } else {
            frame.image.to_rgb8()
        };

        let luma = LumaBuffer::from_rgb(&rgb);
        let sx = w as f64 / luma.width.max(1) as f64;
        let sy = h as f64 / luma.height.max(1) as f64;
        (luma, sx, sy)
    }

    fn passes_filters(&self, comp: &Component, total_pixels: usize) -> bool {
        let min_size = self
            .config
            .min_component_pixels
            .max((total_pixels as f64 * self.config.min_component_fraction) as usize);
        if comp.pixel_count < min_size {
            return false;
        }
        let aspect = comp.aspect_ratio();
        if aspect < self.config.min_aspect_ratio || aspect > self.config.max_aspect_ratio {
            return false;
        }
        comp.fill_ratio() > self.config.min_fill_ratio
    }

    fn score(&self, comp: &Component, dims: FrameDims) -> f64 {
        let cfg = &self.config;
        let mut score = comp.pixel_count as f64;
        if comp.bbox().keeps_margin(dims, cfg.margin_fraction) {
            score *= cfg.margin_bonus;
        }
        let aspect = comp.aspect_ratio();
        if (cfg.aspect_bonus_range.0..=cfg.aspect_bonus_range.1).contains(&aspect) {
            score *= cfg.aspect_bonus;
        }
        if comp.fill_ratio() > cfg.dense_fill_ratio {
            score *= cfg.dense_bonus;
        }
        score
    }

    /// Surviving components, best first, in working-buffer coordinates.
    fn ranked_components(&self, luma: &LumaBuffer) -> Vec<ScoredComponent> {
        let blurred = filters::gaussian_blur(luma);
        let mag = filters::sobel_magnitude(&blurred);
        let peak = mag.max_value();
        if peak <= 0.0 {
            return Vec::new();
        }

        let mask = hysteresis::hysteresis(
            &mag,
            peak * self.config.high_threshold_ratio,
            peak * self.config.low_threshold_ratio,
        );
        let dims = FrameDims::new(luma.width as u32, luma.height as u32);
        let total = luma.len();

        let mut ranked: Vec<ScoredComponent> = connected_components(&mask, luma.width, luma.height)
            .into_iter()
            .filter(|c| self.passes_filters(c, total))
            .map(|component| ScoredComponent {
                score: self.score(&component, dims),
                component,
            })
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked
    }
}

impl ObjectDetector for EdgeDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Edge
    }

    fn detect(&self, frame: &CaptureFrame) -> Result<DetectionOutcome> {
        let (luma, sx, sy) = self.prepare(frame);
        if luma.is_empty() {
            return Ok(DetectionOutcome::empty(DetectorKind::Edge));
        }

        let ranked = self.ranked_components(&luma);
        let to_frame = |c: &Component| {
            let b = c.bbox();
            BoundingBox::new(b.x * sx, b.y * sy, b.width * sx, b.height * sy).clamp_to(frame.dims())
        };

        let primary = ranked.first().map(|best| Detection {
            bbox: to_frame(&best.component),
            score: (BASE_CONFIDENCE + FILL_CONFIDENCE_WEIGHT * best.component.fill_ratio().min(1.0))
                .min(1.0),
        });
        let candidates = ranked.iter().map(|s| to_frame(&s.component)).collect();

        debug!(
            "edge detector: {} candidates on {}x{} working buffer",
            ranked.len(),
            luma.width,
            luma.height
        );

        Ok(DetectionOutcome {
            detector: DetectorKind::Edge,
            primary,
            candidates,
        })
    }
}
