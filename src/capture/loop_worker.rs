use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{controller::CaptureScheduler, state::CycleRejection};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Recurring tick loop for one continuous-capture generation. Each tick
/// spawns a detection cycle unless one is still in flight, in which case the
/// tick is skipped rather than queued.
pub(crate) async fn capture_loop(
    scheduler: CaptureScheduler,
    generation: u64,
    period: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("capture loop shutting down (generation {generation})");
                break;
            }
            _ = ticker.tick() => {
                match scheduler.begin_tick(generation).await {
                    Ok(issued) => {
                        let cycle = scheduler.clone();
                        tokio::spawn(async move {
                            // Failures are recorded on the state; the next tick still fires.
                            if let Err(err) = cycle.run_cycle(issued).await {
                                log_debug!("cycle {issued} ended with error: {err}");
                            }
                        });
                    }
                    Err(CycleRejection::Busy) => {
                        log_debug!("tick skipped: detection still in flight");
                    }
                    Err(CycleRejection::Superseded) => {
                        log_debug!("tick from stale generation {generation}; exiting");
                        break;
                    }
                }
            }
        }
    }
}
