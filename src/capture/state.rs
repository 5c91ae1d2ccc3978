use serde::{Deserialize, Serialize};

use crate::error::{PlatewiseError, PlatewiseResult};
use crate::models::DetectionCandidate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CaptureMode {
    SingleShot,
    Continuous,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", tag = "state")]
pub enum CaptureStatus {
    #[default]
    Idle,
    Running { mode: CaptureMode, busy: bool },
}

impl CaptureStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, CaptureStatus::Running { busy: true, .. })
    }
}

/// Why a capture request did not issue a detection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleRejection {
    /// A detection request is already in flight.
    Busy,
    /// A continuous tick from a generation that has since been stopped or restarted.
    Superseded,
}

#[derive(Debug, Clone, Default)]
pub struct CaptureState {
    pub status: CaptureStatus,
    /// Bumped on every start/stop transition; responses tagged with an older
    /// value are discarded.
    pub generation: u64,
    pub last_results: Vec<DetectionCandidate>,
    pub last_error: Option<PlatewiseError>,
    pub cycles: u64,
    pub skipped_ticks: u64,
}

impl CaptureState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a cycle in flight for a manual capture and return the generation
    /// the response must match.
    pub fn begin_single(&mut self) -> Result<u64, CycleRejection> {
        match self.status {
            CaptureStatus::Idle => {
                self.status = CaptureStatus::Running {
                    mode: CaptureMode::SingleShot,
                    busy: true,
                };
            }
            CaptureStatus::Running { busy: true, .. } => return Err(CycleRejection::Busy),
            CaptureStatus::Running { mode, busy: false } => {
                self.status = CaptureStatus::Running { mode, busy: true };
            }
        }
        Ok(self.generation)
    }

    /// Mark a cycle in flight for a continuous tick issued by `generation`.
    pub fn begin_tick(&mut self, generation: u64) -> Result<u64, CycleRejection> {
        if generation != self.generation {
            return Err(CycleRejection::Superseded);
        }
        match self.status {
            CaptureStatus::Running {
                mode: CaptureMode::Continuous,
                busy: false,
            } => {
                self.status = CaptureStatus::Running {
                    mode: CaptureMode::Continuous,
                    busy: true,
                };
                Ok(self.generation)
            }
            CaptureStatus::Running { busy: true, .. } => {
                self.skipped_ticks += 1;
                Err(CycleRejection::Busy)
            }
            _ => Err(CycleRejection::Superseded),
        }
    }

    /// Apply the outcome of a cycle issued at `issued`. Fails with
    /// `ConcurrencyStale` and leaves the state untouched when a start/stop
    /// happened in between.
    pub fn finish_cycle(
        &mut self,
        issued: u64,
        outcome: &PlatewiseResult<Vec<DetectionCandidate>>,
    ) -> PlatewiseResult<()> {
        if issued != self.generation {
            return Err(PlatewiseError::ConcurrencyStale {
                issued,
                current: self.generation,
            });
        }

        self.status = match self.status {
            CaptureStatus::Running {
                mode: CaptureMode::Continuous,
                ..
            } => CaptureStatus::Running {
                mode: CaptureMode::Continuous,
                busy: false,
            },
            _ => CaptureStatus::Idle,
        };
        self.cycles += 1;

        match outcome {
            Ok(results) => {
                self.last_results = results.clone();
                self.last_error = None;
            }
            Err(err) => {
                self.last_error = Some(err.clone());
            }
        }
        Ok(())
    }

    /// Clear the busy flag for a cycle that produced no frame.
    pub fn abandon_cycle(&mut self, issued: u64) -> PlatewiseResult<()> {
        if issued != self.generation {
            return Err(PlatewiseError::ConcurrencyStale {
                issued,
                current: self.generation,
            });
        }
        self.status = match self.status {
            CaptureStatus::Running {
                mode: CaptureMode::Continuous,
                ..
            } => CaptureStatus::Running {
                mode: CaptureMode::Continuous,
                busy: false,
            },
            _ => CaptureStatus::Idle,
        };
        Ok(())
    }

    pub fn start_continuous(&mut self) -> u64 {
        self.generation += 1;
        self.status = CaptureStatus::Running {
            mode: CaptureMode::Continuous,
            busy: false,
        };
        self.generation
    }

    /// Return to `Idle`, invalidating anything in flight. A no-op when
    /// already idle; returns whether a transition happened.
    pub fn stop(&mut self) -> bool {
        if self.status == CaptureStatus::Idle {
            return false;
        }
        self.generation += 1;
        self.status = CaptureStatus::Idle;
        true
    }
}
