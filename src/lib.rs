//! Item dimension estimation from a phone camera.
//!
//! The host supplies camera frames, tilt samples and a key-value store; the
//! crate locates the item, turns pixels into centimetres and walks the user
//! through capture and confirmation. See [`MeasureKit`] for the usual wiring.

pub mod capability;
pub mod capture;
pub mod db;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod models;
pub mod raster;
pub mod sensing;
pub mod settings;
pub mod utils;

use std::sync::Arc;

use log::info;

use capability::{CapabilityCache, CapabilityClassifier, ClassifierConfig, DeviceProbe};
use capture::{CameraSource, CaptureConfig, CaptureController};
use detection::{
    DetectionDispatcher, EdgeDetector, EdgeDetectorConfig, MlDetectorConfig, ModelLoader,
    ModelSlot,
};
use geometry::{GeometryConfig, GeometryEngine};
use sensing::TiltSource;
use settings::{KeyValueStore, MeasurePreferences};

pub use capture::{MeasurementResult, PositioningHint, ResolutionTier};
pub use error::{MeasureError, MeasureResult, ValidationWarning};
pub use models::{BoundingBox, CaptureFrame, DimensionEstimate, Dimensions, TiltSample};
pub use utils::logging::init_logging;

/// Everything a host needs for measurement sessions, wired together.
#[derive(Clone)]
pub struct MeasureKit {
    pub classifier: Arc<CapabilityClassifier>,
    pub dispatcher: Arc<DetectionDispatcher>,
    pub preferences: MeasurePreferences,
    pub controller: CaptureController,
}

pub struct MeasureKitBuilder {
    camera: Arc<dyn CameraSource>,
    probe: Arc<dyn DeviceProbe>,
    store: Arc<dyn KeyValueStore>,
    model_loader: Option<Arc<dyn ModelLoader>>,
    tilt_source: Option<Arc<dyn TiltSource>>,
    cache: Option<Arc<CapabilityCache>>,
    classifier_config: ClassifierConfig,
    edge_config: EdgeDetectorConfig,
    ml_config: MlDetectorConfig,
    geometry_config: GeometryConfig,
    capture_config: CaptureConfig,
}

impl MeasureKit {
    pub fn builder(
        camera: Arc<dyn CameraSource>,
        probe: Arc<dyn DeviceProbe>,
        store: Arc<dyn KeyValueStore>,
    ) -> MeasureKitBuilder {
        MeasureKitBuilder {
            camera,
            probe,
            store,
            model_loader: None,
            tilt_source: None,
            cache: None,
            classifier_config: ClassifierConfig::default(),
            edge_config: EdgeDetectorConfig::default(),
            ml_config: MlDetectorConfig::default(),
            geometry_config: GeometryConfig::default(),
            capture_config: CaptureConfig::default(),
        }
    }
}

impl MeasureKitBuilder {
    pub fn model_loader(mut self, loader: Arc<dyn ModelLoader>) -> Self {
        self.model_loader = Some(loader);
        self
    }

    pub fn tilt_source(mut self, source: Arc<dyn TiltSource>) -> Self {
        self.tilt_source = Some(source);
        self
    }

    /// Use a private capability cache instead of the process-wide one.
    pub fn capability_cache(mut self, cache: Arc<CapabilityCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn classifier_config(mut self, config: ClassifierConfig) -> Self {
        self.classifier_config = config;
        self
    }

    pub fn edge_config(mut self, config: EdgeDetectorConfig) -> Self {
        self.edge_config = config;
        self
    }

    pub fn ml_config(mut self, config: MlDetectorConfig) -> Self {
        self.ml_config = config;
        self
    }

    pub fn geometry_config(mut self, config: GeometryConfig) -> Self {
        self.geometry_config = config;
        self
    }

    pub fn capture_config(mut self, config: CaptureConfig) -> Self {
        self.capture_config = config;
        self
    }

    /// Classify the device and start the model preload when allowed. Never
    /// waits for the model.
    pub async fn build(self) -> MeasureKit {
        let mut classifier = CapabilityClassifier::new(self.probe, self.classifier_config)
            .with_store(Arc::clone(&self.store));
        if let Some(cache) = self.cache {
            classifier = classifier.with_cache(cache);
        }
        let classifier = Arc::new(classifier);

        let model = self
            .model_loader
            .map(|loader| Arc::new(ModelSlot::new(loader, self.ml_config)));
        let dispatcher = Arc::new(DetectionDispatcher::new(
            EdgeDetector::new(self.edge_config),
            model,
        ));
        let profile = dispatcher.initialize(&classifier).await;
        info!("measurement kit ready, tier {}", profile.tier.as_str());

        let preferences = MeasurePreferences::new(self.store);
        let mut controller = CaptureController::new(
            Arc::clone(&dispatcher),
            self.camera,
            preferences.clone(),
            self.capture_config,
            GeometryEngine::new(self.geometry_config),
        );
        if let Some(source) = self.tilt_source {
            controller = controller.with_tilt_source(source);
        }

        MeasureKit {
            classifier,
            dispatcher,
            preferences,
            controller,
        }
    }
}
