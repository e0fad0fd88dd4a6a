//! Optional pretrained detector.
//!
//! The model itself is supplied by the host through [`ModelLoader`]; this
//! module owns the lazy, load-once lifecycle and the post-processing.

use std::sync::{Arc, RwLock};

use anyhow::Result;
use image::{imageops::FilterType, RgbImage};
use log::{info, warn};
use tokio::sync::OnceCell;

use crate::error::MeasureError;
use crate::models::{BoundingBox, CaptureFrame, DetectorKind};

use super::{Detection, DetectionOutcome, ObjectDetector};

/// One raw model output. `bbox` is `[x, y, width, height]` normalised to
/// `[0, 1]` of the model input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawDetection {
    pub class_id: u32,
    pub score: f32,
    pub bbox: [f32; 4],
}

pub trait ObjectModel: Send + Sync {
    /// Fixed `(width, height)` the model expects.
    fn input_size(&self) -> (u32, u32);

    fn infer(&self, input: &RgbImage) -> Result<Vec<RawDetection>>;
}

pub trait ModelLoader: Send + Sync {
    /// Blocking load of the bundled model.
    fn load(&self) -> Result<Box<dyn ObjectModel>>;
}

#[derive(Debug, Clone)]
pub struct MlDetectorConfig {
    pub min_score: f32,
}

impl Default for MlDetectorConfig {
    fn default() -> Self {
        Self { min_score: 0.5 }
    }
}

pub struct MlDetector {
    model: Box<dyn ObjectModel>,
    config: MlDetectorConfig,
}

impl std::fmt::Debug for MlDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MlDetector")
            .field("input_size", &self.model.input_size())
            .field("config", &self.config)
            .finish()
    }
}

impl MlDetector {
    /// Load the model now. A failed load is [`MeasureError::DetectionUnavailable`].
    pub fn from_loader(
        loader: &dyn ModelLoader,
        config: MlDetectorConfig,
    ) -> Result<Self, MeasureError> {
        match loader.load() {
            Ok(model) => Ok(Self { model, config }),
            Err(err) => {
                warn!("ml model failed to load: {err:#}");
                Err(MeasureError::DetectionUnavailable)
            }
        }
    }

    pub fn from_model(model: Box<dyn ObjectModel>, config: MlDetectorConfig) -> Self {
        Self { model, config }
    }
}

impl ObjectDetector for MlDetector {
    fn kind(&self) -> DetectorKind {
        DetectorKind::Ml
    }

    fn detect(&self, frame: &CaptureFrame) -> Result<DetectionOutcome> {
        let (iw, ih) = self.model.input_size();
        let input = frame
            .image
            .resize_exact(iw.max(1), ih.max(1), FilterType::Triangle)
            .to_rgb8();
        let raw = self.model.infer(&input)?;

        let dims = frame.dims();
        let (fw, fh) = (frame.width as f64, frame.height as f64);
        let mut kept: Vec<Detection> = raw
            .into_iter()
            .filter(|d| d.score >= self.config.min_score)
            .map(|d| {
                let [x, y, w, h] = d.bbox.map(f64::from);
                Detection {
                    bbox: BoundingBox::new(x * fw, y * fh, w * fw, h * fh).clamp_to(dims),
                    score: f64::from(d.score),
                }
            })
            .filter(|d| d.bbox.area() > 0.0)
            .collect();
        kept.sort_by(|a, b| b.bbox.area().total_cmp(&a.bbox.area()));

        Ok(DetectionOutcome {
            detector: DetectorKind::Ml,
            primary: kept.first().copied(),
            candidates: kept.iter().map(|d| d.bbox).collect(),
        })
    }
}

/// Load-once holder for the ML detector.
///
/// Concurrent [`ModelSlot::initialize`] calls share one in-flight load. A
/// failure is remembered as "unavailable" and never retried until
/// [`ModelSlot::reset`].
pub struct ModelSlot {
    loader: Arc<dyn ModelLoader>,
    config: MlDetectorConfig,
    cell: RwLock<Arc<OnceCell<Option<Arc<MlDetector>>>>>,
}

impl ModelSlot {
    pub fn new(loader: Arc<dyn ModelLoader>, config: MlDetectorConfig) -> Self {
        Self {
            loader,
            config,
            cell: RwLock::new(Arc::new(OnceCell::new())),
        }
    }

    fn current(&self) -> Arc<OnceCell<Option<Arc<MlDetector>>>> {
        let guard = match self.cell.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(&guard)
    }

    /// Load the model if nobody has yet. Returns whether it is usable.
    pub async fn initialize(&self) -> bool {
        let cell = self.current();
        let slot = cell
            .get_or_init(|| async {
                let loader = Arc::clone(&self.loader);
                let config = self.config.clone();
                match tokio::task::spawn_blocking(move || {
                    MlDetector::from_loader(loader.as_ref(), config)
                })
                .await
                {
                    Ok(Ok(detector)) => {
                        info!("ml detector ready");
                        Some(Arc::new(detector))
                    }
                    Ok(Err(_)) => None,
                    Err(join_err) => {
                        warn!("ml model load task failed: {join_err}");
                        None
                    }
                }
            })
            .await;
        slot.is_some()
    }

    /// The loaded detector, without waiting.
    pub fn ready(&self) -> Option<Arc<MlDetector>> {
        self.current().get().and_then(Clone::clone)
    }

    /// `true` once a load attempt has finished and failed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self.current().get(), Some(None))
    }

    /// Forget the loaded model or the cached failure. A load still in flight
    /// finishes into the discarded cell.
    pub fn reset(&self) {
        let mut guard = match self.cell.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Arc::new(OnceCell::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;
    use chrono::Utc;
    use image::DynamicImage;

    struct FixedModel(Vec<RawDetection>);

    impl ObjectModel for FixedModel {
        fn input_size(&self) -> (u32, u32) {
            (32, 32)
        }

        fn infer(&self, input: &RgbImage) -> Result<Vec<RawDetection>> {
            assert_eq!(input.dimensions(), (32, 32));
            Ok(self.0.clone())
        }
    }

    struct CountingLoader {
        calls: AtomicUsize,
        fail: bool,
    }

    impl ModelLoader for CountingLoader {
        fn load(&self) -> Result<Box<dyn ObjectModel>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            if self.fail {
                Err(anyhow!("model file missing"))
            } else {
                Ok(Box::new(FixedModel(Vec::new())))
            }
        }
    }

    fn frame(w: u32, h: u32) -> CaptureFrame {
        CaptureFrame::new(DynamicImage::new_rgb8(w, h), Utc::now())
    }

    fn raw(score: f32, bbox: [f32; 4]) -> RawDetection {
        RawDetection {
            class_id: 0,
            score,
            bbox,
        }
    }

    #[test]
    fn picks_largest_confident_box_in_frame_pixels() {
        let model = FixedModel(vec![
            raw(0.95, [0.125, 0.125, 0.25, 0.25]),
            raw(0.625, [0.25, 0.25, 0.5, 0.5]),
            raw(0.25, [0.0, 0.0, 1.0, 1.0]),
        ]);
        let detector = MlDetector::from_model(Box::new(model), MlDetectorConfig::default());
        let outcome = detector.detect(&frame(1000, 500)).unwrap();
        let primary = outcome.primary.expect("a confident box");
        assert_eq!(primary.bbox, BoundingBox::new(250.0, 125.0, 500.0, 250.0));
        assert!((primary.score - 0.625).abs() < 1e-9);
        assert_eq!(outcome.candidates.len(), 2);
    }

    #[test]
    fn low_confidence_only_yields_nothing() {
        let model = FixedModel(vec![raw(0.49, [0.25, 0.25, 0.5, 0.5])]);
        let detector = MlDetector::from_model(Box::new(model), MlDetectorConfig::default());
        assert!(detector.detect(&frame(64, 64)).unwrap().primary.is_none());
    }

    #[test]
    fn boxes_are_clamped_into_frame() {
        let model = FixedModel(vec![raw(0.875, [0.75, 0.75, 0.5, 0.5])]);
        let detector = MlDetector::from_model(Box::new(model), MlDetectorConfig::default());
        let f = frame(100, 100);
        let bbox = detector.detect(&f).unwrap().primary.unwrap().bbox;
        assert!(bbox.is_within(f.dims()));
        assert_eq!(bbox, BoundingBox::new(75.0, 75.0, 25.0, 25.0));
    }

    #[tokio::test]
    async fn concurrent_initialize_loads_once() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let slot = Arc::new(ModelSlot::new(loader.clone(), MlDetectorConfig::default()));

        let (a, b, c) = tokio::join!(slot.initialize(), slot.initialize(), slot.initialize());
        assert!(a && b && c);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert!(slot.ready().is_some());
    }

    #[tokio::test]
    async fn failed_load_is_cached_as_unavailable() {
        let loader = Arc::new(CountingLoader {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let slot = ModelSlot::new(loader.clone(), MlDetectorConfig::default());

        assert!(!slot.initialize().await);
        assert!(!slot.initialize().await);
        assert!(slot.is_unavailable());
        assert!(slot.ready().is_none());
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);

        slot.reset();
        assert!(!slot.is_unavailable());
        assert!(!slot.initialize().await);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }
}
