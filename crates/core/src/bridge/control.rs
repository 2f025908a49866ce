use std::path::PathBuf;
use std::sync::Arc;

use crate::pipeline::capture_session::{CaptureSession, SessionError, SessionState};

/// Boolean/callback facade over a `CaptureSession` for UI shells.
#[derive(Clone)]
pub struct RecorderControl {
    session: Arc<CaptureSession>,
}

impl RecorderControl {
    pub fn new(session: CaptureSession) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    /// `true` if capture is now running. Failures are logged, not returned.
    pub fn start_capture(&self) -> bool {
        match self.session.start() {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Start capture failed: {e}");
                false
            }
        }
    }

    /// The callback receives the recording path, possibly on another thread.
    pub fn stop_capture<F>(&self, callback: F)
    where
        F: FnOnce(Result<PathBuf, SessionError>) + Send + 'static,
    {
        self.session.stop(callback);
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }
}
