use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::models::TiltSample;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

pub(crate) const HISTORY_LEN: usize = 32;

/// Latest sample plus a short history, written by the loop and read by the
/// capture path.
#[derive(Debug)]
pub(crate) struct TiltShared {
    pub(crate) latest: watch::Sender<Option<TiltSample>>,
    pub(crate) history: Mutex<VecDeque<TiltSample>>,
}

impl TiltShared {
    pub(crate) fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            latest,
            history: Mutex::new(VecDeque::with_capacity(HISTORY_LEN)),
        }
    }

    pub(crate) fn record(&self, sample: TiltSample) {
        {
            let mut history = match self.history.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if history.len() == HISTORY_LEN {
                history.pop_front();
            }
            history.push_back(sample);
        }
        self.latest.send_replace(Some(sample));
    }

    pub(crate) fn clear(&self) {
        self.latest.send_replace(None);
        let mut history = match self.history.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.clear();
    }
}

pub(crate) async fn tilt_loop(
    mut samples: broadcast::Receiver<TiltSample>,
    shared: std::sync::Arc<TiltShared>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            sample = samples.recv() => {
                match sample {
                    Ok(sample) => shared.record(sample),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        log_debug!("tilt loop skipped {skipped} stale samples");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        log_info!("tilt stream closed by sensor");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_debug!("tilt loop shutting down");
                break;
            }
        }
    }
}
