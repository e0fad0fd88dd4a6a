use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{MeasureError, MeasureResult};
use crate::models::TiltSample;

use super::loop_worker::{tilt_loop, TiltShared};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Motion-sensor abstraction supplied by the host.
pub trait TiltSource: Send + Sync {
    /// Open a new sample stream. Called once per session; fails with
    /// [`MeasureError::SensorUnavailable`] on devices without a sensor.
    fn subscribe(&self) -> MeasureResult<broadcast::Receiver<TiltSample>>;
}

/// [`TiltSource`] fed through a broadcast sender. Each subscription gets its
/// own receiver, so the host keeps one sender across sessions.
#[derive(Debug, Default)]
pub struct ChannelTiltSource {
    sender: Option<broadcast::Sender<TiltSample>>,
}

impl ChannelTiltSource {
    /// Samples sent while no session is subscribed are dropped.
    pub fn new(capacity: usize) -> (Self, broadcast::Sender<TiltSample>) {
        let (tx, _) = broadcast::channel(capacity.max(1));
        (
            Self {
                sender: Some(tx.clone()),
            },
            tx,
        )
    }

    /// A source that reports no sensor.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

impl TiltSource for ChannelTiltSource {
    fn subscribe(&self) -> MeasureResult<broadcast::Receiver<TiltSample>> {
        self.sender
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or(MeasureError::SensorUnavailable)
    }
}

/// Always-on tilt subscription for the lifetime of one measurement session.
pub struct TiltMonitor {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    shared: Arc<TiltShared>,
}

impl Default for TiltMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl TiltMonitor {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            shared: Arc::new(TiltShared::new()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Subscribe and start recording. No-op while already running. A missing
    /// sensor is logged and returned so tilt correction can be skipped.
    pub fn start(&mut self, source: &dyn TiltSource) -> MeasureResult<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let samples = match source.subscribe() {
            Ok(samples) => samples,
            Err(err) => {
                log_info!("tilt sensor unavailable, skipping tilt correction");
                return Err(err);
            }
        };

        self.shared.clear();
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(tilt_loop(
            samples,
            Arc::clone(&self.shared),
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await.context("tilt loop task failed to join") {
                log_warn!("{err:#}");
            }
        }
    }

    pub fn latest(&self) -> Option<TiltSample> {
        *self.shared.latest.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<Option<TiltSample>> {
        self.shared.latest.subscribe()
    }

    /// Recorded samples, oldest first.
    pub fn samples(&self) -> Vec<TiltSample> {
        let history = match self.shared.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.iter().copied().collect()
    }
}

impl Drop for TiltMonitor {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
