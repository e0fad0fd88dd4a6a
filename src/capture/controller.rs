use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex as StdMutex,
};
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::detection::DetectionDispatcher;
use crate::error::{MeasureError, MeasureResult};
use crate::geometry::GeometryEngine;
use crate::models::{
    AngleTag, Axis, BoundingBox, CaptureFrame, CapturedPhoto, DetectionTier,
    DeviceCapabilityProfile, DimensionEstimate, Dimensions, MeasurementSession, TiltSample,
};
use crate::sensing::{TiltMonitor, TiltSource};
use crate::settings::{MeasurePreferences, PhotoSaveMode};
use crate::utils::BoxFuture;

use super::adjust::NudgeDirection;
use super::finalize::MeasurementResult;
use super::photo::compose_overlay;
use super::pipeline::FramePipeline;
use super::positioning::PositioningHint;
use super::state::{CaptureEvent, CaptureMachine, CaptureState, Effect, Reading};
use super::CaptureConfig;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const NOTICE_CAPACITY: usize = 64;

/// Camera abstraction supplied by the host.
pub trait CameraSource: Send + Sync {
    /// Full-resolution still for a capture.
    fn snapshot(&self) -> BoxFuture<'_, Result<CaptureFrame>>;
}

/// Everything the host UI needs to render, in order.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CaptureNotice {
    Live {
        estimate: DimensionEstimate,
        smoothed: Option<DimensionEstimate>,
        hint: Option<PositioningHint>,
    },
    Transition {
        state: CaptureState,
        effect: Effect,
    },
}

struct Countdown {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

/// Clears a busy flag when dropped.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Async driver around [`CaptureMachine`]: feeds it frames, runs the
/// countdown timer and the capture work, and publishes [`CaptureNotice`]s.
#[derive(Clone)]
pub struct CaptureController {
    machine: Arc<Mutex<CaptureMachine>>,
    dispatcher: Arc<DetectionDispatcher>,
    pipeline: Arc<Mutex<FramePipeline>>,
    camera: Arc<dyn CameraSource>,
    preferences: MeasurePreferences,
    tilt: Arc<Mutex<TiltMonitor>>,
    tilt_source: Option<Arc<dyn TiltSource>>,
    countdown: Arc<StdMutex<Option<Countdown>>>,
    countdown_interval: Duration,
    capturing: Arc<AtomicBool>,
    detecting: Arc<AtomicBool>,
    manual_box: Arc<Mutex<Option<BoundingBox>>>,
    notices: broadcast::Sender<CaptureNotice>,
}

impl CaptureController {
    pub fn new(
        dispatcher: Arc<DetectionDispatcher>,
        camera: Arc<dyn CameraSource>,
        preferences: MeasurePreferences,
        config: CaptureConfig,
        geometry: GeometryEngine,
    ) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            countdown_interval: config.countdown_interval,
            pipeline: Arc::new(Mutex::new(FramePipeline::new(
                geometry,
                config.smoothing_window,
            ))),
            machine: Arc::new(Mutex::new(CaptureMachine::new(config))),
            dispatcher,
            camera,
            preferences,
            tilt: Arc::new(Mutex::new(TiltMonitor::new())),
            tilt_source: None,
            countdown: Arc::new(StdMutex::new(None)),
            capturing: Arc::new(AtomicBool::new(false)),
            detecting: Arc::new(AtomicBool::new(false)),
            manual_box: Arc::new(Mutex::new(None)),
            notices,
        }
    }

    pub fn with_tilt_source(mut self, source: Arc<dyn TiltSource>) -> Self {
        self.tilt_source = Some(source);
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CaptureNotice> {
        self.notices.subscribe()
    }

    pub async fn state(&self) -> CaptureState {
        self.machine.lock().await.state()
    }

    pub async fn session(&self) -> Option<MeasurementSession> {
        self.machine.lock().await.session().cloned()
    }

    pub async fn working_estimate(&self) -> Option<DimensionEstimate> {
        self.machine.lock().await.working_estimate()
    }

    /// Most recent tilt sample of the open session.
    pub async fn latest_tilt(&self) -> Option<TiltSample> {
        self.tilt.lock().await.latest()
    }

    /// Start a measurement session. Returns its id.
    pub async fn open(&self) -> MeasureResult<String> {
        let auto_capture = self.preferences.auto_capture_enabled().await;
        let photo_mode = self.preferences.photo_save_mode().await;
        let profile = self.dispatcher.profile().unwrap_or_else(|| {
            DeviceCapabilityProfile::new(DetectionTier::Simple, "not classified", Utc::now())
        });

        let id = Uuid::new_v4().to_string();
        let session = MeasurementSession::new(
            id.clone(),
            Utc::now(),
            profile,
            self.dispatcher.active_detector(),
        );

        self.dispatch(CaptureEvent::Open {
            session,
            auto_capture,
            photo_mode,
        })
        .await?;

        self.pipeline.lock().await.reset();
        self.manual_box.lock().await.take();
        if let Some(source) = &self.tilt_source {
            // A missing sensor only disables tilt correction.
            let _ = self.tilt.lock().await.start(source.as_ref());
        }

        log_info!(
            "measurement session {id} opened (auto capture {auto_capture}, photos {})",
            photo_mode.as_str()
        );
        Ok(id)
    }

    /// Run live detection on one camera frame. Frames that arrive while a
    /// detection is still running, or outside positioning, are dropped.
    pub async fn submit_frame(&self, frame: CaptureFrame) -> Option<DimensionEstimate> {
        if !self.machine.lock().await.state().accepts_readings() {
            return None;
        }
        let _busy = BusyGuard::acquire(&self.detecting)?;

        let outcome = self.dispatcher.detect(&frame).await;
        let tilt = self.tilt.lock().await.latest();
        let (analysis, smoothed) = {
            let mut pipeline = self.pipeline.lock().await;
            let analysis = pipeline.analyze(&outcome, frame.dims(), tilt);
            (analysis, pipeline.smoothed())
        };

        let event = match &analysis {
            Some(analysis) => CaptureEvent::Reading(Reading {
                bbox: analysis.bbox,
                estimate: analysis.estimate,
                frame: frame.dims(),
                at: time::Instant::now().into_std(),
            }),
            None => CaptureEvent::NoDetection,
        };
        // Stream events never fail.
        let _ = self.dispatch(event).await;

        let analysis = analysis?;
        let hint = self.machine.lock().await.hint();
        let _ = self.notices.send(CaptureNotice::Live {
            estimate: analysis.estimate,
            smoothed,
            hint,
        });
        Some(analysis.estimate)
    }

    /// Capture the current slot now. Dropped silently while a capture is
    /// already running.
    pub async fn request_capture(&self) -> MeasureResult<()> {
        if self.capturing.load(Ordering::Acquire) {
            log_debug!("capture already in progress, ignoring request");
            return Ok(());
        }
        match self.dispatch(CaptureEvent::CaptureRequested).await {
            Ok(Effect::BeginCapture { slot }) => {
                self.cancel_countdown();
                self.run_capture(slot).await
            }
            Ok(_) => Ok(()),
            // The countdown got there first.
            Err(MeasureError::InvalidTransition {
                state: "capturing", ..
            }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Capture the current slot using a user-drawn box instead of detection.
    pub async fn capture_with_box(&self, bbox: BoundingBox) -> MeasureResult<()> {
        *self.manual_box.lock().await = Some(bbox);
        let result = self.request_capture().await;
        self.manual_box.lock().await.take();
        result
    }

    pub async fn add_angle(&self) -> MeasureResult<()> {
        self.dispatch(CaptureEvent::AddAngle).await.map(|_| ())
    }

    pub async fn skip_angles(&self) -> MeasureResult<Effect> {
        self.dispatch(CaptureEvent::SkipAngles).await
    }

    pub async fn nudge(&self, axis: Axis, direction: NudgeDirection) -> MeasureResult<Effect> {
        self.dispatch(CaptureEvent::Nudge { axis, direction }).await
    }

    pub async fn set_dimensions(&self, dimensions: Dimensions) -> MeasureResult<Effect> {
        self.dispatch(CaptureEvent::SetDimensions(dimensions)).await
    }

    pub async fn retake(&self) -> MeasureResult<()> {
        self.dispatch(CaptureEvent::Retake).await?;
        self.pipeline.lock().await.reset();
        Ok(())
    }

    /// Finish the session. `save_photos` answers the save prompt when the
    /// stored preference is "ask".
    pub async fn accept(&self, save_photos: Option<bool>) -> MeasureResult<MeasurementResult> {
        match self.dispatch(CaptureEvent::Accept { save_photos }).await? {
            Effect::Finished { result } => {
                log_info!(
                    "measurement finished: {}x{}x{} cm at {:.2}",
                    result.dimensions.length,
                    result.dimensions.width,
                    result.dimensions.height,
                    result.confidence
                );
                Ok(result)
            }
            _ => Err(MeasureError::InvalidTransition {
                state: "finalizing",
                event: "accept",
            }),
        }
    }

    pub async fn cancel(&self) {
        let _ = self.dispatch(CaptureEvent::Cancel).await;
    }

    async fn dispatch(&self, event: CaptureEvent) -> MeasureResult<Effect> {
        let (state, effect) = {
            let mut machine = self.machine.lock().await;
            let effect = machine.apply(event)?;
            (machine.state(), effect)
        };

        match &effect {
            Effect::StartCountdown { slot, ticks } => {
                log_debug!("countdown armed for slot {slot} ({ticks} ticks)");
                self.spawn_countdown();
            }
            Effect::CancelCountdown => {
                log_debug!("countdown cancelled");
                self.cancel_countdown();
            }
            Effect::Finished { .. } | Effect::Closed => {
                self.cancel_countdown();
                self.tilt.lock().await.stop().await;
                self.pipeline.lock().await.reset();
            }
            _ => {}
        }

        if !matches!(effect, Effect::None) {
            let _ = self.notices.send(CaptureNotice::Transition {
                state,
                effect: effect.clone(),
            });
        }
        Ok(effect)
    }

    fn spawn_countdown(&self) {
        let mut guard = match self.countdown.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = guard.take() {
            previous.token.cancel();
            previous.handle.abort();
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let controller = self.clone();
        let interval = self.countdown_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + interval, interval);
            let slot = loop {
                tokio::select! {
                    _ = cancelled.cancelled() => return,
                    _ = ticker.tick() => {
                        match controller.dispatch(CaptureEvent::CountdownTick).await {
                            Ok(Effect::CountdownStep { .. }) => continue,
                            Ok(Effect::BeginCapture { slot }) => break slot,
                            _ => return,
                        }
                    }
                }
            };

            // From here on the capture belongs to this task; detach so a
            // later cancel does not abort it halfway.
            controller.detach_countdown();
            if let Err(err) = controller.run_capture(slot).await {
                log_warn!("countdown capture for slot {slot} failed: {err}");
            }
        });

        *guard = Some(Countdown { handle, token });
    }

    fn cancel_countdown(&self) {
        let mut guard = match self.countdown.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(countdown) = guard.take() {
            countdown.token.cancel();
            countdown.handle.abort();
        }
    }

    fn detach_countdown(&self) {
        let mut guard = match self.countdown.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }

    async fn run_capture(&self, slot: usize) -> MeasureResult<()> {
        let Some(_busy) = BusyGuard::acquire(&self.capturing) else {
            log_debug!("capture already in progress, dropping slot {slot}");
            return Ok(());
        };

        match self.capture_slot(slot).await {
            Ok(event) => match self.dispatch(event).await {
                Ok(_) => {
                    log_info!("captured slot {slot}");
                    Ok(())
                }
                // Session cancelled while the capture was in flight.
                Err(MeasureError::InvalidTransition { .. }) => Err(MeasureError::Cancelled),
                Err(err) => Err(err),
            },
            Err(reason) => {
                log_warn!("capture for slot {slot} failed: {reason}");
                match self
                    .dispatch(CaptureEvent::CaptureFailed {
                        reason: reason.clone(),
                    })
                    .await
                {
                    Ok(_) => Err(MeasureError::CaptureFailed(reason)),
                    Err(MeasureError::InvalidTransition { .. }) => Err(MeasureError::Cancelled),
                    Err(err) => Err(err),
                }
            }
        }
    }

    /// Snapshot, locate, measure and photograph one angle.
    async fn capture_slot(&self, slot: usize) -> std::result::Result<CaptureEvent, String> {
        let frame = self
            .camera
            .snapshot()
            .await
            .map_err(|err| format!("snapshot failed: {err:#}"))?;
        let dims = frame.dims();

        let manual = self.manual_box.lock().await.take();
        let (bbox, score, others) = match manual {
            Some(bbox) => (bbox.clamp_to(dims), 1.0, Vec::new()),
            None => {
                let outcome = self.dispatcher.detect(&frame).await;
                let primary = outcome
                    .primary
                    .ok_or_else(|| MeasureError::NoObjectDetected.to_string())?;
                (primary.bbox, primary.score, outcome.secondary_candidates())
            }
        };
        if bbox.area() <= 0.0 {
            return Err(MeasureError::NoObjectDetected.to_string());
        }

        let tilt = self.tilt.lock().await.latest();
        let analysis = self
            .pipeline
            .lock()
            .await
            .estimate_box(bbox, score, &others, dims, tilt);

        let (photo_mode, session_id) = {
            let machine = self.machine.lock().await;
            (
                machine.photo_mode(),
                machine.session().map(|s| s.id.clone()).unwrap_or_default(),
            )
        };
        let photo = if photo_mode == PhotoSaveMode::Never {
            None
        } else {
            self.compose_photo(frame, bbox, slot, &session_id, &analysis.estimate)
                .await
        };

        Ok(CaptureEvent::CaptureSucceeded {
            estimate: analysis.estimate,
            photo,
            reference: analysis.reference,
            tilt,
        })
    }

    async fn compose_photo(
        &self,
        frame: CaptureFrame,
        bbox: BoundingBox,
        slot: usize,
        session_id: &str,
        estimate: &DimensionEstimate,
    ) -> Option<CapturedPhoto> {
        let timestamp = frame.timestamp;
        let encoded = tokio::task::spawn_blocking(move || compose_overlay(&frame, &bbox)).await;
        let jpeg = match encoded {
            Ok(Ok(jpeg)) => jpeg,
            Ok(Err(err)) => {
                log_warn!("overlay photo for slot {slot} skipped: {err:#}");
                return None;
            }
            Err(join_err) => {
                log_warn!("overlay photo task failed: {join_err}");
                return None;
            }
        };
        Some(CapturedPhoto {
            image_ref: format!("{session_id}/angle-{slot}.jpg"),
            jpeg,
            dimensions: estimate.dimensions,
            timestamp,
            confidence: estimate.confidence,
            angle_tag: AngleTag::for_slot(slot),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_guard_is_exclusive() {
        let flag = AtomicBool::new(false);
        let first = BusyGuard::acquire(&flag);
        assert!(first.is_some());
        assert!(BusyGuard::acquire(&flag).is_none());
        drop(first);
        assert!(BusyGuard::acquire(&flag).is_some());
    }
}
