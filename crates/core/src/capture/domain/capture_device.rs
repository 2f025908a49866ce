use thiserror::Error;

use crate::capture::domain::sample_sink::SampleSink;
use crate::shared::constants::DEFAULT_CAPTURE_FPS;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no depth-capable camera available")]
    NoDepthCamera,
    #[error("failed to lock capture device: {0}")]
    DeviceLock(String),
    #[error("cannot attach capture {what}: {reason}")]
    Attach { what: &'static str, reason: String },
    #[error("capture device is already streaming")]
    AlreadyStreaming,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraPosition {
    Back,
    Front,
}

/// What the session asks the platform for when opening a camera.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraPreference {
    pub position: CameraPosition,
    pub prefer_wide_angle: bool,
    pub fps: u32,
    /// Ask the platform to fill holes and smooth the depth stream.
    pub depth_filtering: bool,
}

impl Default for CameraPreference {
    fn default() -> Self {
        Self {
            position: CameraPosition::Back,
            prefer_wide_angle: true,
            fps: DEFAULT_CAPTURE_FPS,
            depth_filtering: true,
        }
    }
}

/// A camera delivering time-correlated video + depth bundles.
///
/// After `stop_streaming` returns, the device must not push further bundles.
pub trait CaptureDevice: Send {
    fn description(&self) -> String;

    fn start_streaming(&mut self, sink: SampleSink) -> Result<(), CaptureError>;

    fn stop_streaming(&mut self);
}

/// Platform camera discovery.
pub trait CameraProvider: Send + Sync {
    fn open(&self, preference: &CameraPreference) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}
