use thiserror::Error;

use crate::shared::config::CaptureConfig;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("{0}")]
    Open(String),
    #[error("capture device is not open")]
    NotOpen,
    #[error("failed to read frame: {0}")]
    Read(String),
    #[error("capture stream ended")]
    EndOfStream,
}

/// What the caller would like from the device. Size and rate are
/// preferences, not requirements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureRequest {
    pub device: Option<String>,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl From<&CaptureConfig> for CaptureRequest {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            device: config.device.clone(),
            width: config.width,
            height: config.height,
            fps: config.fps,
        }
    }
}

/// What the device actually granted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureInfo {
    pub device: String,
    pub width: u32,
    pub height: u32,
}

/// A camera-like producer of frames.
///
/// Owned and driven by a single thread; `open` acquires the device and
/// `close` releases it. `close` must be safe to call repeatedly.
pub trait FrameSource: Send {
    fn open(&mut self, request: &CaptureRequest) -> Result<CaptureInfo, CaptureError>;

    /// Returns the most recent frame, blocking until one is available.
    fn grab(&mut self) -> Result<Frame, CaptureError>;

    fn close(&mut self);

    fn is_open(&self) -> bool;
}
