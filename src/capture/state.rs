use std::time::Instant;

use log::debug;
use serde::Serialize;

use crate::error::{MeasureError, MeasureResult, ValidationWarning};
use crate::geometry::validate_dimensions;
use crate::models::{
    AngleCapture, Axis, BoundingBox, CapturedPhoto, DimensionEstimate, Dimensions, FrameDims,
    MeasurementSession, ReferenceObject, ResolutionPath, TiltSample, MAX_ANGLE_SLOTS,
};
use crate::settings::PhotoSaveMode;

use super::adjust::{self, NudgeDirection};
use super::finalize::{finalize, MeasurementResult};
use super::positioning::{is_ready, positioning_hint, PositioningHint, PositioningTracker};
use super::resolution::{boost_confidence, tier_for, ResolutionTier};
use super::CaptureConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CaptureState {
    Idle,
    Positioning { slot: usize },
    CountdownArmed { slot: usize, remaining: u32 },
    Capturing { slot: usize },
    AwaitingNextAngle { captured: usize },
    Resolving,
    Resolved { tier: ResolutionTier },
    Finalizing,
}

impl CaptureState {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Positioning { .. } => "positioning",
            CaptureState::CountdownArmed { .. } => "countdownArmed",
            CaptureState::Capturing { .. } => "capturing",
            CaptureState::AwaitingNextAngle { .. } => "awaitingNextAngle",
            CaptureState::Resolving => "resolving",
            CaptureState::Resolved { .. } => "resolved",
            CaptureState::Finalizing => "finalizing",
        }
    }

    /// States that consume the live detection stream.
    pub fn accepts_readings(&self) -> bool {
        matches!(
            self,
            CaptureState::Positioning { .. } | CaptureState::CountdownArmed { .. }
        )
    }
}

/// One live detection result.
#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub bbox: BoundingBox,
    pub estimate: DimensionEstimate,
    pub frame: FrameDims,
    pub at: Instant,
}

#[derive(Debug, Clone)]
pub enum CaptureEvent {
    Open {
        session: MeasurementSession,
        auto_capture: bool,
        photo_mode: PhotoSaveMode,
    },
    Reading(Reading),
    NoDetection,
    CountdownTick,
    CaptureRequested,
    CaptureSucceeded {
        estimate: DimensionEstimate,
        photo: Option<CapturedPhoto>,
        reference: Option<ReferenceObject>,
        tilt: Option<TiltSample>,
    },
    CaptureFailed {
        reason: String,
    },
    AddAngle,
    SkipAngles,
    Nudge {
        axis: Axis,
        direction: NudgeDirection,
    },
    SetDimensions(Dimensions),
    Retake,
    Accept {
        save_photos: Option<bool>,
    },
    Cancel,
}

impl CaptureEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureEvent::Open { .. } => "open",
            CaptureEvent::Reading(_) => "reading",
            CaptureEvent::NoDetection => "noDetection",
            CaptureEvent::CountdownTick => "countdownTick",
            CaptureEvent::CaptureRequested => "captureRequested",
            CaptureEvent::CaptureSucceeded { .. } => "captureSucceeded",
            CaptureEvent::CaptureFailed { .. } => "captureFailed",
            CaptureEvent::AddAngle => "addAngle",
            CaptureEvent::SkipAngles => "skipAngles",
            CaptureEvent::Nudge { .. } => "nudge",
            CaptureEvent::SetDimensions(_) => "setDimensions",
            CaptureEvent::Retake => "retake",
            CaptureEvent::Accept { .. } => "accept",
            CaptureEvent::Cancel => "cancel",
        }
    }
}

/// What the driver has to do after a transition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "effect", rename_all = "camelCase")]
pub enum Effect {
    None,
    Hint {
        hint: PositioningHint,
    },
    StartCountdown {
        slot: usize,
        ticks: u32,
    },
    CountdownStep {
        remaining: u32,
    },
    CancelCountdown,
    BeginCapture {
        slot: usize,
    },
    PromptNextAngle {
        captured: usize,
    },
    RetryAngle {
        slot: usize,
        reason: String,
    },
    Resolved {
        tier: ResolutionTier,
        estimate: DimensionEstimate,
        warnings: Vec<ValidationWarning>,
    },
    Adjusted {
        estimate: DimensionEstimate,
        warnings: Vec<ValidationWarning>,
    },
    Restarted,
    Finished {
        result: MeasurementResult,
    },
    Closed,
}

/// Pure capture orchestration. Owns the session and every slot; nothing
/// here touches the camera, the clock or the executor.
#[derive(Debug)]
pub struct CaptureMachine {
    config: CaptureConfig,
    state: CaptureState,
    session: Option<MeasurementSession>,
    auto_capture: bool,
    photo_mode: PhotoSaveMode,
    tracker: PositioningTracker,
    hint: Option<PositioningHint>,
    working: Option<DimensionEstimate>,
}

impl CaptureMachine {
    /// `config.max_slots` is clamped to the slots a session can hold.
    pub fn new(mut config: CaptureConfig) -> Self {
        config.max_slots = config.max_slots.clamp(1, MAX_ANGLE_SLOTS);
        Self {
            config,
            state: CaptureState::Idle,
            session: None,
            auto_capture: true,
            photo_mode: PhotoSaveMode::default(),
            tracker: PositioningTracker::new(),
            hint: None,
            working: None,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&MeasurementSession> {
        self.session.as_ref()
    }

    pub fn hint(&self) -> Option<PositioningHint> {
        self.hint
    }

    pub fn photo_mode(&self) -> PhotoSaveMode {
        self.photo_mode
    }

    /// The estimate shown in the resolved view, including user edits.
    pub fn working_estimate(&self) -> Option<DimensionEstimate> {
        self.working
    }

    pub fn apply(&mut self, event: CaptureEvent) -> MeasureResult<Effect> {
        let from = self.state;
        let event_name = event.name();
        let effect = self.transition(event)?;
        if from != self.state {
            debug!(
                "capture {} -> {} on {}",
                from.name(),
                self.state.name(),
                event_name
            );
        }
        Ok(effect)
    }

    fn invalid(&self, event: &'static str) -> MeasureError {
        MeasureError::InvalidTransition {
            state: self.state.name(),
            event,
        }
    }

    fn transition(&mut self, event: CaptureEvent) -> MeasureResult<Effect> {
        let event_name = event.name();
        match (self.state, event) {
            (
                CaptureState::Idle,
                CaptureEvent::Open {
                    session,
                    auto_capture,
                    photo_mode,
                },
            ) => {
                self.session = Some(session);
                self.auto_capture = auto_capture;
                self.photo_mode = photo_mode;
                self.working = None;
                self.enter_positioning(1);
                Ok(Effect::None)
            }

            (CaptureState::Positioning { slot }, CaptureEvent::Reading(reading)) => {
                let (hint, ready) = self.observe(&reading);
                if ready && self.auto_capture {
                    let ticks = self.config.countdown_ticks.max(1);
                    self.state = CaptureState::CountdownArmed {
                        slot,
                        remaining: ticks,
                    };
                    Ok(Effect::StartCountdown { slot, ticks })
                } else {
                    Ok(Effect::Hint { hint })
                }
            }
            (CaptureState::CountdownArmed { slot, .. }, CaptureEvent::Reading(reading)) => {
                let (_, ready) = self.observe(&reading);
                if ready {
                    Ok(Effect::None)
                } else {
                    self.state = CaptureState::Positioning { slot };
                    Ok(Effect::CancelCountdown)
                }
            }
            (CaptureState::Positioning { .. }, CaptureEvent::NoDetection) => {
                self.tracker.reset();
                self.hint = None;
                Ok(Effect::None)
            }
            (CaptureState::CountdownArmed { slot, .. }, CaptureEvent::NoDetection) => {
                self.tracker.reset();
                self.hint = None;
                self.state = CaptureState::Positioning { slot };
                Ok(Effect::CancelCountdown)
            }
            (_, CaptureEvent::Reading(_) | CaptureEvent::NoDetection) => Ok(Effect::None),

            (CaptureState::CountdownArmed { slot, remaining }, CaptureEvent::CountdownTick) => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.state = CaptureState::Capturing { slot };
                    Ok(Effect::BeginCapture { slot })
                } else {
                    self.state = CaptureState::CountdownArmed { slot, remaining };
                    Ok(Effect::CountdownStep { remaining })
                }
            }
            // A tick that raced a cancellation.
            (_, CaptureEvent::CountdownTick) => Ok(Effect::None),

            (
                CaptureState::Positioning { slot } | CaptureState::CountdownArmed { slot, .. },
                CaptureEvent::CaptureRequested,
            ) => {
                self.state = CaptureState::Capturing { slot };
                Ok(Effect::BeginCapture { slot })
            }

            (
                CaptureState::Capturing { slot },
                CaptureEvent::CaptureSucceeded {
                    estimate,
                    photo,
                    reference,
                    tilt,
                },
            ) => self.store_capture(slot, estimate, photo, reference, tilt),
            (CaptureState::Capturing { slot }, CaptureEvent::CaptureFailed { reason }) => {
                self.enter_positioning(slot);
                Ok(Effect::RetryAngle { slot, reason })
            }

            (CaptureState::AwaitingNextAngle { captured }, CaptureEvent::AddAngle)
                if captured < self.config.max_slots =>
            {
                self.enter_positioning(captured + 1);
                Ok(Effect::None)
            }
            (CaptureState::AwaitingNextAngle { .. }, CaptureEvent::SkipAngles) => self.resolve(),

            (CaptureState::Resolved { .. }, CaptureEvent::Nudge { axis, direction }) => {
                let step = self.config.nudge_step_cm;
                self.edit(|estimate| adjust::nudge(estimate, axis, direction, step))
            }
            (CaptureState::Resolved { .. }, CaptureEvent::SetDimensions(dimensions)) => {
                self.edit(|estimate| adjust::set_dimensions(estimate, dimensions))
            }
            (CaptureState::Resolved { .. }, CaptureEvent::Retake) => {
                if let Some(session) = self.session.as_mut() {
                    session.captures.clear();
                    session.final_estimate = None;
                    session.resolution = None;
                    session.reference = None;
                }
                self.working = None;
                self.enter_positioning(1);
                Ok(Effect::Restarted)
            }
            (CaptureState::Resolved { .. }, CaptureEvent::Accept { save_photos }) => {
                let estimate = self.working.ok_or_else(|| self.invalid(event_name))?;
                self.state = CaptureState::Finalizing;
                let photos = self
                    .session
                    .as_ref()
                    .map(|session| session.captures.photos())
                    .unwrap_or_default();
                let result = finalize(&estimate, photos, self.photo_mode, save_photos);
                self.close();
                Ok(Effect::Finished { result })
            }

            (CaptureState::Idle, CaptureEvent::Cancel) => Ok(Effect::None),
            (_, CaptureEvent::Cancel) => {
                self.close();
                Ok(Effect::Closed)
            }

            (_, _) => Err(self.invalid(event_name)),
        }
    }

    fn enter_positioning(&mut self, slot: usize) {
        self.tracker.reset();
        self.hint = None;
        self.state = CaptureState::Positioning { slot };
    }

    /// Feed the stability tracker and return the hint plus readiness.
    fn observe(&mut self, reading: &Reading) -> (PositioningHint, bool) {
        let coverage = reading.bbox.coverage(reading.frame);
        let confidence = reading.estimate.confidence;
        self.tracker
            .observe(reading.estimate.dimensions, reading.at, &self.config);
        let hint = positioning_hint(coverage, confidence, &self.config);
        self.hint = Some(hint);
        let ready = is_ready(
            confidence,
            coverage,
            self.tracker.is_stable(&self.config),
            &self.config,
        );
        (hint, ready)
    }

    fn store_capture(
        &mut self,
        slot: usize,
        estimate: DimensionEstimate,
        photo: Option<CapturedPhoto>,
        reference: Option<ReferenceObject>,
        tilt: Option<TiltSample>,
    ) -> MeasureResult<Effect> {
        let session = self
            .session
            .as_mut()
            .ok_or(MeasureError::InvalidTransition {
                state: "capturing",
                event: "captureSucceeded",
            })?;
        if !session.captures.store(slot, AngleCapture { estimate, photo }) {
            return Err(MeasureError::CaptureFailed(format!("slot {slot} out of range")));
        }
        if reference.is_some() {
            session.reference = reference;
        }
        if let Some(tilt) = tilt {
            session.tilt_samples.push(tilt);
        }

        if slot < self.config.max_slots {
            self.state = CaptureState::AwaitingNextAngle { captured: slot };
            Ok(Effect::PromptNextAngle { captured: slot })
        } else {
            self.resolve()
        }
    }

    fn resolve(&mut self) -> MeasureResult<Effect> {
        self.state = CaptureState::Resolving;
        let session = self
            .session
            .as_mut()
            .ok_or(MeasureError::InvalidTransition {
                state: "resolving",
                event: "resolve",
            })?;
        let main = session
            .captures
            .main()
            .map(|c| c.estimate)
            .ok_or(MeasureError::NoObjectDetected)?;

        let confidence =
            boost_confidence(main.confidence, session.captures.extra_angles(), &self.config);
        let estimate = DimensionEstimate { confidence, ..main };
        let tier = tier_for(confidence, &self.config);

        session.final_estimate = Some(estimate);
        session.resolution = Some(tier.path());
        self.working = Some(estimate);
        self.state = CaptureState::Resolved { tier };

        Ok(Effect::Resolved {
            tier,
            estimate,
            warnings: validate_dimensions(&estimate.dimensions),
        })
    }

    fn edit(
        &mut self,
        change: impl FnOnce(&DimensionEstimate) -> DimensionEstimate,
    ) -> MeasureResult<Effect> {
        let current = self.working.ok_or(MeasureError::InvalidTransition {
            state: "resolved",
            event: "adjust",
        })?;
        let estimate = change(&current);
        self.working = Some(estimate);
        if let Some(session) = self.session.as_mut() {
            session.final_estimate = Some(estimate);
            session.resolution = Some(ResolutionPath::Manual);
        }
        Ok(Effect::Adjusted {
            estimate,
            warnings: validate_dimensions(&estimate.dimensions),
        })
    }

    /// Back to idle; the session is dropped.
    fn close(&mut self) {
        self.session = None;
        self.working = None;
        self.tracker.reset();
        self.hint = None;
        self.state = CaptureState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectionTier, DetectorKind, DeviceCapabilityProfile};
    use chrono::Utc;
    use std::time::Duration;

    const FRAME: FrameDims = FrameDims::new(1000, 1000);

    fn session() -> MeasurementSession {
        MeasurementSession::new(
            "s-1".into(),
            Utc::now(),
            DeviceCapabilityProfile::new(DetectionTier::Simple, "test", Utc::now()),
            DetectorKind::Edge,
        )
    }

    fn open(auto_capture: bool) -> CaptureMachine {
        let mut machine = CaptureMachine::new(CaptureConfig::default());
        machine
            .apply(CaptureEvent::Open {
                session: session(),
                auto_capture,
                photo_mode: PhotoSaveMode::Never,
            })
            .unwrap();
        machine
    }

    fn estimate(confidence: f64) -> DimensionEstimate {
        DimensionEstimate::new(
            Dimensions::new(30.0, 20.0, 10.0),
            confidence,
            BoundingBox::new(150.0, 150.0, 700.0, 700.0),
        )
    }

    fn reading(confidence: f64, at: Instant) -> CaptureEvent {
        CaptureEvent::Reading(Reading {
            bbox: BoundingBox::new(150.0, 150.0, 700.0, 700.0), // 49%
            estimate: estimate(confidence),
            frame: FRAME,
            at,
        })
    }

    fn succeed(machine: &mut CaptureMachine, confidence: f64) -> Effect {
        machine
            .apply(CaptureEvent::CaptureSucceeded {
                estimate: estimate(confidence),
                photo: None,
                reference: None,
                tilt: None,
            })
            .unwrap()
    }

    #[test]
    fn stale_ticks_and_readings_are_ignored() {
        let mut machine = CaptureMachine::new(CaptureConfig::default());
        assert!(matches!(
            machine.apply(CaptureEvent::CountdownTick).unwrap(),
            Effect::None
        ));
        assert!(matches!(
            machine.apply(reading(0.9, Instant::now())).unwrap(),
            Effect::None
        ));
        assert_eq!(machine.state(), CaptureState::Idle);
    }

    #[test]
    fn user_events_in_wrong_state_are_rejected() {
        let mut machine = open(true);
        let err = machine.apply(CaptureEvent::SkipAngles).unwrap_err();
        assert!(matches!(
            err,
            MeasureError::InvalidTransition {
                state: "positioning",
                event: "skipAngles"
            }
        ));
        assert!(machine.apply(CaptureEvent::Retake).is_err());
        assert_eq!(machine.state(), CaptureState::Positioning { slot: 1 });
    }

    #[test]
    fn auto_capture_disabled_never_arms() {
        let mut machine = open(false);
        let t0 = Instant::now();
        for i in 0..6 {
            let effect = machine
                .apply(reading(0.9, t0 + Duration::from_millis(500 * i)))
                .unwrap();
            assert!(matches!(effect, Effect::Hint { hint: PositioningHint::Perfect }));
        }
        assert_eq!(machine.state(), CaptureState::Positioning { slot: 1 });
    }

    #[test]
    fn losing_readiness_cancels_countdown() {
        let mut machine = open(true);
        let t0 = Instant::now();
        machine.apply(reading(0.9, t0)).unwrap();
        let effect = machine
            .apply(reading(0.9, t0 + Duration::from_millis(1600)))
            .unwrap();
        assert!(matches!(effect, Effect::StartCountdown { slot: 1, ticks: 3 }));

        machine.apply(CaptureEvent::CountdownTick).unwrap();
        let effect = machine
            .apply(reading(0.6, t0 + Duration::from_millis(2000)))
            .unwrap();
        assert!(matches!(effect, Effect::CancelCountdown));
        assert_eq!(machine.state(), CaptureState::Positioning { slot: 1 });

        // The tick already in flight must not capture.
        assert!(matches!(
            machine.apply(CaptureEvent::CountdownTick).unwrap(),
            Effect::None
        ));
        assert_eq!(machine.state(), CaptureState::Positioning { slot: 1 });
    }

    #[test]
    fn failed_capture_keeps_earlier_slots() {
        let mut machine = open(false);
        machine.apply(CaptureEvent::CaptureRequested).unwrap();
        succeed(&mut machine, 0.8);
        machine.apply(CaptureEvent::AddAngle).unwrap();
        machine.apply(CaptureEvent::CaptureRequested).unwrap();

        let effect = machine
            .apply(CaptureEvent::CaptureFailed {
                reason: "snapshot failed".into(),
            })
            .unwrap();
        assert!(matches!(effect, Effect::RetryAngle { slot: 2, .. }));
        assert_eq!(machine.state(), CaptureState::Positioning { slot: 2 });
        assert_eq!(machine.session().unwrap().captures.filled_count(), 1);
    }

    #[test]
    fn third_slot_resolves_without_prompt() {
        let mut machine = open(false);
        for slot in 1..=3 {
            machine.apply(CaptureEvent::CaptureRequested).unwrap();
            let effect = succeed(&mut machine, 0.8);
            if slot < 3 {
                assert!(matches!(effect, Effect::PromptNextAngle { captured } if captured == slot));
                machine.apply(CaptureEvent::AddAngle).unwrap();
            } else {
                assert!(matches!(effect, Effect::Resolved { .. }));
            }
        }
        assert!(matches!(machine.state(), CaptureState::Resolved { .. }));
    }

    #[test]
    fn retake_discards_slots() {
        let mut machine = open(false);
        machine.apply(CaptureEvent::CaptureRequested).unwrap();
        succeed(&mut machine, 0.8);
        machine.apply(CaptureEvent::SkipAngles).unwrap();

        assert!(matches!(machine.apply(CaptureEvent::Retake).unwrap(), Effect::Restarted));
        assert_eq!(machine.state(), CaptureState::Positioning { slot: 1 });
        assert_eq!(machine.session().unwrap().captures.filled_count(), 0);
    }

    #[test]
    fn cancel_discards_session_from_any_state() {
        let mut machine = open(false);
        machine.apply(CaptureEvent::CaptureRequested).unwrap();
        assert!(matches!(machine.apply(CaptureEvent::Cancel).unwrap(), Effect::Closed));
        assert_eq!(machine.state(), CaptureState::Idle);
        assert!(machine.session().is_none());
    }

    #[test]
    fn oversized_slot_config_still_resolves_at_last_slot() {
        let config = CaptureConfig {
            max_slots: 5,
            ..CaptureConfig::default()
        };
        let mut machine = CaptureMachine::new(config);
        assert_eq!(machine.config().max_slots, MAX_ANGLE_SLOTS);
        machine
            .apply(CaptureEvent::Open {
                session: session(),
                auto_capture: false,
                photo_mode: PhotoSaveMode::Never,
            })
            .unwrap();

        for slot in 1..=MAX_ANGLE_SLOTS {
            machine.apply(CaptureEvent::CaptureRequested).unwrap();
            let effect = succeed(&mut machine, 0.8);
            if slot < MAX_ANGLE_SLOTS {
                machine.apply(CaptureEvent::AddAngle).unwrap();
            } else {
                assert!(matches!(effect, Effect::Resolved { .. }));
            }
        }
        assert!(matches!(machine.state(), CaptureState::Resolved { .. }));
    }
}
