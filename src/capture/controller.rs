use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    api::DetectionService,
    detection::{normalize_with_limit, MAX_CANDIDATES},
    error::{PlatewiseError, PlatewiseResult},
    models::DetectionCandidate,
    settings::{Settings, DEFAULT_CAPTURE_PERIOD_MS},
};

use super::{
    loop_worker::capture_loop,
    source::FrameSource,
    state::{CaptureState, CaptureStatus, CycleRejection},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConfig {
    pub period: Duration,
    pub max_candidates: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(DEFAULT_CAPTURE_PERIOD_MS),
            max_candidates: MAX_CANDIDATES,
        }
    }
}

impl From<&Settings> for CaptureConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            period: Duration::from_millis(settings.capture_period_ms),
            max_candidates: settings.max_candidates,
        }
    }
}

/// What the presentation layer renders for the capture surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSnapshot {
    pub status: CaptureStatus,
    pub generation: u64,
    pub last_results: Vec<DetectionCandidate>,
    pub last_error: Option<String>,
    pub cycles: u64,
    pub skipped_ticks: u64,
}

impl From<&CaptureState> for CaptureSnapshot {
    fn from(state: &CaptureState) -> Self {
        Self {
            status: state.status,
            generation: state.generation,
            last_results: state.last_results.clone(),
            last_error: state.last_error.as_ref().map(ToString::to_string),
            cycles: state.cycles,
            skipped_ticks: state.skipped_ticks,
        }
    }
}

/// Result of a capture request that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// The ranked candidates were applied as the current results.
    Applied(Vec<DetectionCandidate>),
    /// A detection request was already in flight; nothing was issued.
    Rejected,
    /// The response arrived after a start/stop transition and was discarded.
    Dropped,
    /// The frame source had no frame to offer.
    NoFrame,
}

struct LoopHandle {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Drives single-shot and continuous detection cycles with at most one
/// request in flight.
#[derive(Clone)]
pub struct CaptureScheduler {
    state: Arc<Mutex<CaptureState>>,
    detector: Arc<dyn DetectionService>,
    source: Arc<dyn FrameSource>,
    worker: Arc<Mutex<Option<LoopHandle>>>,
    snapshots: Arc<watch::Sender<CaptureSnapshot>>,
    config: CaptureConfig,
}

impl CaptureScheduler {
    pub fn new(
        detector: Arc<dyn DetectionService>,
        source: Arc<dyn FrameSource>,
        config: CaptureConfig,
    ) -> Self {
        let (snapshots, _) = watch::channel(CaptureSnapshot::default());
        Self {
            state: Arc::new(Mutex::new(CaptureState::new())),
            detector,
            source,
            worker: Arc::new(Mutex::new(None)),
            snapshots: Arc::new(snapshots),
            config,
        }
    }

    pub async fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot::from(&*self.state.lock().await)
    }

    /// Receiver that observes every applied state change.
    pub fn subscribe(&self) -> watch::Receiver<CaptureSnapshot> {
        self.snapshots.subscribe()
    }

    /// Run one detection cycle now. Rejected, not queued, while another
    /// request is in flight.
    pub async fn capture_once(&self) -> PlatewiseResult<CaptureOutcome> {
        let issued = {
            let mut state = self.state.lock().await;
            match state.begin_single() {
                Ok(issued) => {
                    self.publish(&state);
                    issued
                }
                Err(_) => {
                    log_debug!("capture rejected: detection already in flight");
                    return Ok(CaptureOutcome::Rejected);
                }
            }
        };

        self.run_cycle(issued).await
    }

    /// Start (or restart) the recurring capture timer. `None` uses the
    /// configured period.
    pub async fn start_continuous(&self, period_ms: Option<u64>) -> PlatewiseResult<u64> {
        let period = period_ms
            .map(Duration::from_millis)
            .unwrap_or(self.config.period);
        if period.is_zero() {
            return Err(PlatewiseError::validation(
                "capture period must be greater than zero",
            ));
        }

        let mut worker = self.worker.lock().await;
        if let Some(previous) = worker.take() {
            previous.cancel_token.cancel();
            if let Err(err) = previous.handle.await {
                log_warn!("previous capture loop failed to join: {err}");
            }
        }

        let generation = {
            let mut state = self.state.lock().await;
            let generation = state.start_continuous();
            self.publish(&state);
            generation
        };

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(
            self.clone(),
            generation,
            period,
            cancel_token.clone(),
        ));
        *worker = Some(LoopHandle {
            handle,
            cancel_token,
        });

        log_info!(
            "continuous capture started (generation {generation}, every {}ms)",
            period.as_millis()
        );
        Ok(generation)
    }

    /// Cancel the timer and return to idle. Once this returns no further
    /// tick fires, and any response still in flight is discarded on arrival.
    pub async fn stop_continuous(&self) -> bool {
        // Held across the transition and the join so a concurrent start
        // either completes first or sees this stop's outcome.
        let mut worker = self.worker.lock().await;
        let transitioned = {
            let mut state = self.state.lock().await;
            let transitioned = state.stop();
            if transitioned {
                self.publish(&state);
            }
            transitioned
        };

        if let Some(previous) = worker.take() {
            previous.cancel_token.cancel();
            if let Err(err) = previous.handle.await {
                log_warn!("capture loop failed to join: {err}");
            }
        }

        if transitioned {
            log_info!("capture stopped");
        }
        transitioned
    }

    /// Release the capture surface. Safe to call any number of times.
    pub async fn teardown(&self) {
        self.stop_continuous().await;
    }

    pub(crate) async fn begin_tick(&self, generation: u64) -> Result<u64, CycleRejection> {
        let mut state = self.state.lock().await;
        let issued = state.begin_tick(generation);
        self.publish(&state);
        issued
    }

    pub(crate) async fn run_cycle(&self, issued: u64) -> PlatewiseResult<CaptureOutcome> {
        let outcome = match self.source.capture_frame().await {
            Ok(Some(frame)) => self
                .detector
                .detect(frame)
                .await
                .and_then(|raw| normalize_with_limit(raw, self.config.max_candidates)),
            Ok(None) => return self.abandon_cycle(issued).await,
            Err(err) => Err(err),
        };

        let mut state = self.state.lock().await;
        if let Err(stale) = state.finish_cycle(issued, &outcome) {
            log_debug!("dropping detection response: {stale}");
            return Ok(CaptureOutcome::Dropped);
        }
        self.publish(&state);
        drop(state);

        match outcome {
            Ok(candidates) => {
                log_debug!(
                    "applied {} candidates (generation {issued})",
                    candidates.len()
                );
                Ok(CaptureOutcome::Applied(candidates))
            }
            Err(err) => {
                log_warn!("detection cycle failed: {err}");
                Err(err)
            }
        }
    }

    async fn abandon_cycle(&self, issued: u64) -> PlatewiseResult<CaptureOutcome> {
        let mut state = self.state.lock().await;
        match state.abandon_cycle(issued) {
            Ok(()) => {
                self.publish(&state);
                log_debug!("no frame available; cycle abandoned");
                Ok(CaptureOutcome::NoFrame)
            }
            Err(_) => Ok(CaptureOutcome::Dropped),
        }
    }

    fn publish(&self, state: &CaptureState) {
        self.snapshots.send_replace(CaptureSnapshot::from(state));
    }
}
