//! In-crate fakes for the camera and encoder collaborators.
//!
//! Only compiled for `#[cfg(test)]`. The fakes record what the pipeline did
//! so tests can assert on it without real hardware or codecs.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::capture::domain::capture_device::{
    CameraPreference, CameraProvider, CaptureDevice, CaptureError,
};
use crate::capture::domain::sample::{RawDepthData, SampleBundle, SyncedPair};
use crate::capture::domain::sample_sink::SampleSink;
use crate::encoding::domain::video_encoder::{
    EncodedFile, EncodeError, EncoderConfig, EncoderFactory, EncoderSession,
};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::depth_map::DepthMap;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::timestamp::Timestamp;

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

fn video(width: u32, height: u32) -> PixelBuffer {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            data.extend_from_slice(&[x as u8, y as u8, 7, 255]);
        }
    }
    PixelBuffer::new(data, width, height)
}

/// A valid pair: patterned video, 1 m depth everywhere.
pub fn pair(nanos: i64, video_w: u32, depth_w: u32, height: u32) -> SyncedPair {
    SyncedPair {
        timestamp: Timestamp::from_nanos(nanos),
        video: video(video_w, height),
        depth: DepthMap::filled(depth_w, height, 1.0),
    }
}

pub fn bundle(nanos: i64, video_w: u32, depth_w: u32, height: u32) -> SampleBundle {
    let p = pair(nanos, video_w, depth_w, height);
    SampleBundle::complete(p.timestamp, p.video, RawDepthData::Depth32(p.depth))
}

/// Polls `condition` until it holds, panicking after a few seconds.
pub fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(1));
    }
}

// ── Encoder ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct AppendedFrame {
    pub buffer: PixelBuffer,
    pub timestamp: Timestamp,
}

#[derive(Clone, Debug, Default)]
pub struct EncoderLog {
    pub configured: Vec<(u32, u32)>,
    pub started_at: Option<Timestamp>,
    pub appended: Vec<AppendedFrame>,
    pub input_finished: bool,
    pub finalized: bool,
}

impl EncoderLog {
    pub fn appended_timestamps(&self) -> Vec<Timestamp> {
        self.appended.iter().map(|f| f.timestamp).collect()
    }
}

/// Encoder factory whose sessions write a small placeholder file and log
/// every call. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingEncoderFactory {
    log: Arc<Mutex<EncoderLog>>,
    ready_script: Arc<Mutex<VecDeque<bool>>>,
    configure_failures: Arc<AtomicUsize>,
    failing_appends: Arc<Vec<i64>>,
    fail_finalize: bool,
}

impl RecordingEncoderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successive `is_ready` answers; `true` once the script runs out.
    pub fn with_ready_script(self, script: Vec<bool>) -> Self {
        *self.ready_script.lock().unwrap() = script.into();
        self
    }

    pub fn failing_first_configures(self, count: usize) -> Self {
        self.configure_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Appends at these timestamps (nanos) fail.
    pub fn failing_appends(mut self, nanos: Vec<i64>) -> Self {
        self.failing_appends = Arc::new(nanos);
        self
    }

    pub fn failing_finalize(mut self) -> Self {
        self.fail_finalize = true;
        self
    }

    pub fn log(&self) -> EncoderLog {
        self.log.lock().unwrap().clone()
    }
}

impl EncoderFactory for RecordingEncoderFactory {
    fn configure(&self, config: &EncoderConfig) -> Result<Box<dyn EncoderSession>, EncodeError> {
        let remaining = self.configure_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.configure_failures.store(remaining - 1, Ordering::SeqCst);
            // Like a real muxer, the output file exists before setup fails.
            let _ = std::fs::write(&config.path, b"");
            return Err(EncodeError::Configure {
                width: config.width,
                height: config.height,
                reason: "scripted failure".to_string(),
            });
        }

        std::fs::write(&config.path, b"header").map_err(|e| EncodeError::Configure {
            width: config.width,
            height: config.height,
            reason: e.to_string(),
        })?;
        self.log
            .lock()
            .unwrap()
            .configured
            .push((config.width, config.height));

        Ok(Box::new(RecordingEncoderSession {
            factory: self.clone(),
            path: config.path.clone(),
            started: false,
            finished: false,
        }))
    }
}

struct RecordingEncoderSession {
    factory: RecordingEncoderFactory,
    path: PathBuf,
    started: bool,
    finished: bool,
}

impl EncoderSession for RecordingEncoderSession {
    fn is_ready(&self) -> bool {
        let scripted = self.factory.ready_script.lock().unwrap().pop_front();
        !self.finished && scripted.unwrap_or(true)
    }

    fn start_session(&mut self, at: Timestamp) {
        self.started = true;
        self.factory.log.lock().unwrap().started_at = Some(at);
    }

    fn append(&mut self, frame: &PixelBuffer, timestamp: Timestamp) -> Result<(), EncodeError> {
        if !self.started {
            return Err(EncodeError::SessionNotStarted);
        }
        if self.factory.failing_appends.contains(&timestamp.as_nanos()) {
            return Err(EncodeError::Append {
                timestamp,
                reason: "scripted failure".to_string(),
            });
        }
        self.factory.log.lock().unwrap().appended.push(AppendedFrame {
            buffer: frame.clone(),
            timestamp,
        });
        Ok(())
    }

    fn mark_input_finished(&mut self) {
        self.finished = true;
        self.factory.log.lock().unwrap().input_finished = true;
    }

    fn finalize(self: Box<Self>) -> Result<EncodedFile, EncodeError> {
        if self.factory.fail_finalize {
            return Err(EncodeError::Finalize {
                path: self.path.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        let mut log = self.factory.log.lock().unwrap();
        log.finalized = true;
        let frames = log.appended.len();
        std::fs::write(&self.path, format!("frames={frames}")).map_err(|e| {
            EncodeError::Finalize {
                path: self.path.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(EncodedFile {
            path: self.path.clone(),
            frames,
        })
    }
}

// ── Camera ────────────────────────────────────────────────────────────

/// Camera provider whose device forwards bundles pushed by the test.
#[derive(Clone, Default)]
pub struct ScriptedCameraProvider {
    sink: Arc<Mutex<Option<SampleSink>>>,
    no_depth_camera: bool,
    attach_fails: bool,
    stop_calls: Arc<AtomicUsize>,
}

impl ScriptedCameraProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn without_depth_camera() -> Self {
        Self {
            no_depth_camera: true,
            ..Self::default()
        }
    }

    pub fn failing_attach() -> Self {
        Self {
            attach_fails: true,
            ..Self::default()
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    /// Delivers a bundle, retrying while the synchronizer queue is full.
    pub fn push(&self, bundle: SampleBundle) {
        wait_until("sample queue space", || {
            let sink = self.sink.lock().unwrap();
            match sink.as_ref() {
                Some(s) => s.push(bundle.clone()),
                None => panic!("camera is not streaming"),
            }
        });
    }
}

impl CameraProvider for ScriptedCameraProvider {
    fn open(&self, _preference: &CameraPreference) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        if self.no_depth_camera {
            return Err(CaptureError::NoDepthCamera);
        }
        Ok(Box::new(ScriptedCamera {
            provider: self.clone(),
        }))
    }
}

struct ScriptedCamera {
    provider: ScriptedCameraProvider,
}

impl CaptureDevice for ScriptedCamera {
    fn description(&self) -> String {
        "scripted camera".to_string()
    }

    fn start_streaming(&mut self, sink: SampleSink) -> Result<(), CaptureError> {
        if self.provider.attach_fails {
            return Err(CaptureError::Attach {
                what: "depth output",
                reason: "scripted failure".to_string(),
            });
        }
        *self.provider.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn stop_streaming(&mut self) {
        self.provider.sink.lock().unwrap().take();
        self.provider.stop_calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ── Logger ────────────────────────────────────────────────────────────

/// Logger exposing submitted/dropped counts to the test thread.
#[derive(Clone, Default)]
pub struct CountingLogger {
    pub submitted: Arc<AtomicUsize>,
    pub dropped: Arc<AtomicUsize>,
}

impl PipelineLogger for CountingLogger {
    fn frame_submitted(&mut self) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
    }

    fn frame_dropped(&mut self, _reason: &str) {
        self.dropped.fetch_add(1, Ordering::SeqCst);
    }

    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}

    fn info(&mut self, _message: &str) {}
}
