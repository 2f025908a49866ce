use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::bridge::control::RecorderControl;
use crate::pipeline::capture_session::SessionError;

pub const CHANNEL_NAME: &str = "lidar_channel";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown method: {0}")]
pub struct UnknownMethod(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MethodCall {
    Start,
    Stop,
}

impl FromStr for MethodCall {
    type Err = UnknownMethod;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "startLidar" | "startCapture" => Ok(MethodCall::Start),
            "stopLidar" | "stopCapture" => Ok(MethodCall::Stop),
            other => Err(UnknownMethod(other.to_string())),
        }
    }
}

/// Reply sent back to the UI shell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MethodResult {
    Bool(bool),
    Path(PathBuf),
    Error { code: String, message: String },
    NotImplemented,
}

impl From<SessionError> for MethodResult {
    fn from(error: SessionError) -> Self {
        let code = match &error {
            SessionError::AlreadyActive => "ALREADY_ACTIVE",
            SessionError::CapabilityUnavailable(_) => "UNAVAILABLE",
            SessionError::AttachFailed(_) => "ATTACH_FAILED",
            SessionError::NotCapturing => "NOT_CAPTURING",
            SessionError::NoFramesCaptured => "NO_FRAMES",
            SessionError::FinalizeFailed(_) => "FINALIZE_FAILED",
        };
        MethodResult::Error {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

/// Dispatches named method calls onto a `RecorderControl`.
pub struct MethodChannel {
    control: RecorderControl,
}

impl MethodChannel {
    pub fn new(control: RecorderControl) -> Self {
        Self { control }
    }

    pub fn control(&self) -> &RecorderControl {
        &self.control
    }

    /// `reply` is called exactly once; for stop calls it runs on the
    /// finalize thread.
    pub fn handle<F>(&self, method: &str, reply: F)
    where
        F: FnOnce(MethodResult) + Send + 'static,
    {
        match method.parse::<MethodCall>() {
            Ok(MethodCall::Start) => reply(MethodResult::Bool(self.control.start_capture())),
            Ok(MethodCall::Stop) => self.control.stop_capture(move |result| {
                reply(match result {
                    Ok(path) => MethodResult::Path(path),
                    Err(e) => e.into(),
                })
            }),
            Err(e) => {
                log::debug!("{CHANNEL_NAME}: {e}");
                reply(MethodResult::NotImplemented);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rstest::rstest;

    use crate::pipeline::capture_session::CaptureSession;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::capture_settings::CaptureSettings;
    use crate::testing::{bundle, wait_until, RecordingEncoderFactory, ScriptedCameraProvider};

    fn channel(
        provider: &ScriptedCameraProvider,
        factory: &RecordingEncoderFactory,
        dir: &std::path::Path,
    ) -> MethodChannel {
        let settings = CaptureSettings {
            output_dir: Some(dir.to_path_buf()),
            ..CaptureSettings::default()
        };
        let session =
            CaptureSession::new(Arc::new(provider.clone()), Arc::new(factory.clone()), settings)
                .with_logger(|| Box::new(NullPipelineLogger));
        MethodChannel::new(RecorderControl::new(session))
    }

    fn call(channel: &MethodChannel, method: &str) -> MethodResult {
        let (tx, rx) = crossbeam_channel::bounded(1);
        channel.handle(method, move |result| {
            let _ = tx.send(result);
        });
        rx.recv().unwrap()
    }

    #[rstest]
    #[case::start_lidar("startLidar", Ok(MethodCall::Start))]
    #[case::start_capture("startCapture", Ok(MethodCall::Start))]
    #[case::stop_lidar("stopLidar", Ok(MethodCall::Stop))]
    #[case::stop_capture("stopCapture", Ok(MethodCall::Stop))]
    #[case::unknown("pause", Err(UnknownMethod("pause".to_string())))]
    #[case::case_sensitive("StartLidar", Err(UnknownMethod("StartLidar".to_string())))]
    fn test_parse_method_names(
        #[case] name: &str,
        #[case] expected: Result<MethodCall, UnknownMethod>,
    ) {
        assert_eq!(name.parse::<MethodCall>(), expected);
    }

    #[test]
    fn test_unknown_method_is_not_implemented() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(
            &ScriptedCameraProvider::new(),
            &RecordingEncoderFactory::new(),
            dir.path(),
        );
        assert_eq!(call(&channel, "zoom"), MethodResult::NotImplemented);
    }

    #[test]
    fn test_start_without_depth_camera_replies_false() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(
            &ScriptedCameraProvider::without_depth_camera(),
            &RecordingEncoderFactory::new(),
            dir.path(),
        );
        assert_eq!(call(&channel, "startLidar"), MethodResult::Bool(false));
    }

    #[test]
    fn test_stop_without_frames_replies_error() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(
            &ScriptedCameraProvider::new(),
            &RecordingEncoderFactory::new(),
            dir.path(),
        );
        assert_eq!(call(&channel, "startCapture"), MethodResult::Bool(true));
        match call(&channel, "stopCapture") {
            MethodResult::Error { code, .. } => assert_eq!(code, "NO_FRAMES"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn test_full_recording_replies_path() {
        let dir = tempfile::tempdir().unwrap();
        let provider = ScriptedCameraProvider::new();
        let factory = RecordingEncoderFactory::new();
        let channel = channel(&provider, &factory, dir.path());

        assert_eq!(call(&channel, "startLidar"), MethodResult::Bool(true));
        provider.push(bundle(1, 512, 256, 960));
        wait_until("one appended frame", || factory.log().appended.len() == 1);

        match call(&channel, "stopLidar") {
            MethodResult::Path(path) => assert!(path.starts_with(dir.path())),
            other => panic!("expected path, got {other:?}"),
        }
    }

    #[test]
    fn test_stop_when_idle_replies_not_capturing() {
        let dir = tempfile::tempdir().unwrap();
        let channel = channel(
            &ScriptedCameraProvider::new(),
            &RecordingEncoderFactory::new(),
            dir.path(),
        );
        assert_eq!(
            call(&channel, "stopLidar"),
            MethodResult::from(SessionError::NotCapturing)
        );
    }
}
