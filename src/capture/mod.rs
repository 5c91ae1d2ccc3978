pub mod controller;
mod loop_worker;
pub mod source;
pub mod state;

pub use controller::{CaptureConfig, CaptureOutcome, CaptureScheduler, CaptureSnapshot};
pub use source::{FileFrameSource, FrameSource};
pub use state::{CaptureMode, CaptureState, CaptureStatus};
