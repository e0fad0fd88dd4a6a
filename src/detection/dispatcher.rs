use std::sync::{Arc, Mutex, RwLock};

use log::{debug, info, warn};
use tokio::task::JoinHandle;

use crate::capability::CapabilityClassifier;
use crate::models::{CaptureFrame, DetectionTier, DetectorKind, DeviceCapabilityProfile};

use super::edge::EdgeDetector;
use super::ml::ModelSlot;
use super::{DetectionOutcome, ObjectDetector};

/// Routes each frame to the best available detector.
///
/// Never fails: detector errors and panics come back as an empty
/// [`DetectionOutcome`] from the edge or ML path alike.
pub struct DetectionDispatcher {
    edge: Arc<EdgeDetector>,
    model: Option<Arc<ModelSlot>>,
    profile: RwLock<Option<DeviceCapabilityProfile>>,
    preload: Mutex<Option<JoinHandle<bool>>>,
}

impl DetectionDispatcher {
    pub fn new(edge: EdgeDetector, model: Option<Arc<ModelSlot>>) -> Self {
        Self {
            edge: Arc::new(edge),
            model,
            profile: RwLock::new(None),
            preload: Mutex::new(None),
        }
    }

    /// Edge detection only, for hosts that bundle no model.
    pub fn edge_only() -> Self {
        Self::new(EdgeDetector::default(), None)
    }

    /// Classify the device and, when enhanced, start loading the model in the
    /// background. Returns without waiting for the load.
    pub async fn initialize(&self, classifier: &CapabilityClassifier) -> DeviceCapabilityProfile {
        let profile = classifier.classify().await;
        self.set_profile(profile.clone());

        if profile.tier == DetectionTier::Enhanced && !self.start_preload() {
            info!("enhanced device but no model bundled; using edge detection");
        }
        profile
    }

    /// Spawn a background model load, replacing any pending one. `false`
    /// when no model is bundled.
    fn start_preload(&self) -> bool {
        let Some(slot) = &self.model else {
            return false;
        };
        let slot = Arc::clone(slot);
        let handle = tokio::spawn(async move { slot.initialize().await });
        let mut guard = match self.preload.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = guard.replace(handle) {
            previous.abort();
        }
        true
    }

    /// Drop the loaded model or a cached load failure. On an enhanced device
    /// a fresh load starts in the background; until it lands frames go to
    /// the edge detector.
    pub fn reset_model(&self) {
        let Some(slot) = &self.model else {
            return;
        };
        {
            let mut guard = match self.preload.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(pending) = guard.take() {
                pending.abort();
            }
        }
        slot.reset();
        if self.tier() == DetectionTier::Enhanced {
            self.start_preload();
        }
    }

    /// Install a profile directly, bypassing classification.
    pub fn set_profile(&self, profile: DeviceCapabilityProfile) {
        let mut guard = match self.profile.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(profile);
    }

    pub fn profile(&self) -> Option<DeviceCapabilityProfile> {
        let guard = match self.profile.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }

    fn tier(&self) -> DetectionTier {
        self.profile().map(|p| p.tier).unwrap_or_default()
    }

    /// Which detector the next frame would go to.
    pub fn active_detector(&self) -> DetectorKind {
        self.pick().kind()
    }

    fn pick(&self) -> Arc<dyn ObjectDetector> {
        if self.tier() == DetectionTier::Enhanced {
            if let Some(ml) = self.model.as_ref().and_then(|slot| slot.ready()) {
                return ml;
            }
        }
        self.edge.clone()
    }

    /// Wait for a background model load started by [`initialize`](Self::initialize).
    /// Returns whether the model ended up usable.
    pub async fn wait_for_model(&self) -> bool {
        let handle = {
            let mut guard = match self.preload.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.take()
        };
        match handle {
            Some(handle) => handle.await.unwrap_or(false),
            None => self.model.as_ref().is_some_and(|slot| slot.ready().is_some()),
        }
    }

    pub async fn detect(&self, frame: &CaptureFrame) -> DetectionOutcome {
        let detector = self.pick();
        let kind = detector.kind();
        let frame = frame.clone();

        match tokio::task::spawn_blocking(move || detector.detect(&frame)).await {
            Ok(Ok(outcome)) => {
                debug!(
                    "{} detector found {} candidates",
                    kind.as_str(),
                    outcome.candidates.len()
                );
                outcome
            }
            Ok(Err(err)) => {
                warn!("{} detector failed, treating as no detection: {err:#}", kind.as_str());
                DetectionOutcome::empty(kind)
            }
            Err(join_err) => {
                warn!("{} detector task aborted: {join_err}", kind.as_str());
                DetectionOutcome::empty(kind)
            }
        }
    }
}

impl Drop for DetectionDispatcher {
    fn drop(&mut self) {
        let guard = match self.preload.get_mut() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = guard.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::ml::{MlDetectorConfig, ModelLoader, ObjectModel, RawDetection};
    use anyhow::{anyhow, Result};
    use chrono::Utc;
    use image::{DynamicImage, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BoxModel;

    impl ObjectModel for BoxModel {
        fn input_size(&self) -> (u32, u32) {
            (16, 16)
        }

        fn infer(&self, _input: &RgbImage) -> Result<Vec<RawDetection>> {
            Ok(vec![RawDetection {
                class_id: 1,
                score: 0.75,
                bbox: [0.25, 0.25, 0.5, 0.5],
            }])
        }
    }

    struct PanickingModel;

    impl ObjectModel for PanickingModel {
        fn input_size(&self) -> (u32, u32) {
            (16, 16)
        }

        fn infer(&self, _input: &RgbImage) -> Result<Vec<RawDetection>> {
            panic!("inference crashed");
        }
    }

    struct Loader {
        panics: bool,
        fails: bool,
    }

    impl ModelLoader for Loader {
        fn load(&self) -> Result<Box<dyn ObjectModel>> {
            if self.fails {
                return Err(anyhow!("missing weights"));
            }
            if self.panics {
                Ok(Box::new(PanickingModel))
            } else {
                Ok(Box::new(BoxModel))
            }
        }
    }

    /// Fails the first load, succeeds afterwards.
    struct FlakyLoader {
        calls: AtomicUsize,
    }

    impl ModelLoader for FlakyLoader {
        fn load(&self) -> Result<Box<dyn ObjectModel>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(anyhow!("weights still downloading"))
            } else {
                Ok(Box::new(BoxModel))
            }
        }
    }

    fn enhanced() -> DeviceCapabilityProfile {
        DeviceCapabilityProfile::new(DetectionTier::Enhanced, "test", Utc::now())
    }

    fn dispatcher(loader: Loader) -> (DetectionDispatcher, Arc<ModelSlot>) {
        let slot = Arc::new(ModelSlot::new(Arc::new(loader), MlDetectorConfig::default()));
        (
            DetectionDispatcher::new(EdgeDetector::default(), Some(slot.clone())),
            slot,
        )
    }

    fn blank_frame() -> CaptureFrame {
        CaptureFrame::new(DynamicImage::new_rgb8(64, 64), Utc::now())
    }

    #[tokio::test]
    async fn simple_tier_always_uses_edge() {
        let (dispatcher, slot) = dispatcher(Loader {
            panics: false,
            fails: false,
        });
        assert!(slot.initialize().await);
        dispatcher.set_profile(DeviceCapabilityProfile::new(
            DetectionTier::Simple,
            "test",
            Utc::now(),
        ));
        assert_eq!(dispatcher.active_detector(), DetectorKind::Edge);
    }

    #[tokio::test]
    async fn enhanced_falls_back_until_model_ready() {
        let (dispatcher, slot) = dispatcher(Loader {
            panics: false,
            fails: false,
        });
        dispatcher.set_profile(enhanced());
        assert_eq!(dispatcher.active_detector(), DetectorKind::Edge);

        assert!(slot.initialize().await);
        assert_eq!(dispatcher.active_detector(), DetectorKind::Ml);
        let outcome = dispatcher.detect(&blank_frame()).await;
        assert_eq!(outcome.detector, DetectorKind::Ml);
        assert!(outcome.primary.is_some());
    }

    #[tokio::test]
    async fn failed_model_downgrades_silently() {
        let (dispatcher, slot) = dispatcher(Loader {
            panics: false,
            fails: true,
        });
        dispatcher.set_profile(enhanced());
        assert!(!slot.initialize().await);
        assert_eq!(dispatcher.active_detector(), DetectorKind::Edge);
        let outcome = dispatcher.detect(&blank_frame()).await;
        assert_eq!(outcome.detector, DetectorKind::Edge);
        assert!(outcome.primary.is_none());
    }

    #[tokio::test]
    async fn detector_panic_is_no_detection() {
        let (dispatcher, slot) = dispatcher(Loader {
            panics: true,
            fails: false,
        });
        dispatcher.set_profile(enhanced());
        assert!(slot.initialize().await);
        let outcome = dispatcher.detect(&blank_frame()).await;
        assert_eq!(outcome, DetectionOutcome::empty(DetectorKind::Ml));
    }

    #[tokio::test]
    async fn reset_model_retries_a_failed_load() {
        let loader = Arc::new(FlakyLoader {
            calls: AtomicUsize::new(0),
        });
        let slot = Arc::new(ModelSlot::new(loader.clone(), MlDetectorConfig::default()));
        let dispatcher = DetectionDispatcher::new(EdgeDetector::default(), Some(slot.clone()));
        dispatcher.set_profile(enhanced());

        assert!(!slot.initialize().await);
        assert!(slot.is_unavailable());
        assert_eq!(dispatcher.active_detector(), DetectorKind::Edge);

        dispatcher.reset_model();
        assert!(dispatcher.wait_for_model().await);
        assert_eq!(dispatcher.active_detector(), DetectorKind::Ml);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reset_model_on_simple_tier_does_not_load() {
        let loader = Arc::new(FlakyLoader {
            calls: AtomicUsize::new(0),
        });
        let slot = Arc::new(ModelSlot::new(loader.clone(), MlDetectorConfig::default()));
        let dispatcher = DetectionDispatcher::new(EdgeDetector::default(), Some(slot));
        dispatcher.set_profile(DeviceCapabilityProfile::new(
            DetectionTier::Simple,
            "test",
            Utc::now(),
        ));

        dispatcher.reset_model();
        assert!(!dispatcher.wait_for_model().await);
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }
}
