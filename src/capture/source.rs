use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{PlatewiseError, PlatewiseResult};
use crate::models::ImagePayload;

/// Where capture cycles get their frames from (a camera, a watched file, a test fixture).
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Grab the current frame. `Ok(None)` means the surface had nothing to
    /// offer this time (camera not ready yet) and the cycle is abandoned.
    async fn capture_frame(&self) -> PlatewiseResult<Option<ImagePayload>>;
}

/// Reads the frame from an image file on every capture, for camera tools
/// that keep overwriting a snapshot on disk.
pub struct FileFrameSource {
    path: PathBuf,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FrameSource for FileFrameSource {
    async fn capture_frame(&self) -> PlatewiseResult<Option<ImagePayload>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(PlatewiseError::validation(format!(
                    "failed to read frame {}: {err}",
                    self.path.display()
                )))
            }
        };
        if bytes.is_empty() {
            return Ok(None);
        }

        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture.jpg".to_string());
        Ok(Some(ImagePayload::new(bytes, file_name)))
    }
}
