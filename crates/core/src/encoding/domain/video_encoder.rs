use std::path::PathBuf;

use thiserror::Error;

use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::timestamp::Timestamp;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("encoder setup failed for {width}x{height}: {reason}")]
    Configure {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("frame is {actual_w}x{actual_h}, encoder expects {expected_w}x{expected_h}")]
    FrameSize {
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },
    #[error("append before the writing session was started")]
    SessionNotStarted,
    #[error("append after input was marked finished")]
    InputFinished,
    #[error("encoding frame at {timestamp} failed: {reason}")]
    Append { timestamp: Timestamp, reason: String },
    #[error("finalizing {path} failed: {reason}")]
    Finalize { path: PathBuf, reason: String },
}

/// Parameters fixed for the lifetime of one output file.
#[derive(Clone, Debug, PartialEq)]
pub struct EncoderConfig {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// A finished recording.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedFile {
    pub path: PathBuf,
    pub frames: usize,
}

/// Creates encoder sessions once the output dimensions are known.
pub trait EncoderFactory: Send + Sync {
    fn configure(&self, config: &EncoderConfig) -> Result<Box<dyn EncoderSession>, EncodeError>;
}

/// One open output file accepting timestamped frames.
pub trait EncoderSession: Send {
    /// `false` means the encoder cannot take a frame right now; callers drop
    /// the frame instead of waiting.
    fn is_ready(&self) -> bool;

    /// Opens the writing session; the first appended frame carries `at`.
    fn start_session(&mut self, at: Timestamp);

    fn append(&mut self, frame: &PixelBuffer, timestamp: Timestamp) -> Result<(), EncodeError>;

    fn mark_input_finished(&mut self);

    /// Flushes and closes the container. Blocking; run off the capture thread.
    fn finalize(self: Box<Self>) -> Result<EncodedFile, EncodeError>;
}
