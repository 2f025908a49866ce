use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use crate::capture::domain::capture_device::{
    CameraPreference, CameraProvider, CaptureDevice, CaptureError,
};
use crate::capture::stream_synchronizer::{StreamSynchronizer, SyncStats};
use crate::compositing::infrastructure::side_by_side_compositor::SideBySideCompositor;
use crate::depth::infrastructure::grayscale_normalizer::GrayscaleNormalizer;
use crate::encoding::domain::video_encoder::EncoderFactory;
use crate::encoding::infrastructure::image_file_writer::ImageFileWriter;
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::pipeline_logger::{PipelineLogger, StdoutPipelineLogger};
use crate::shared::capture_settings::CaptureSettings;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("a capture session is already active")]
    AlreadyActive,
    #[error("depth capture unavailable: {0}")]
    CapabilityUnavailable(#[source] CaptureError),
    #[error("failed to attach capture pipeline: {0}")]
    AttachFailed(String),
    #[error("no capture session is running")]
    NotCapturing,
    #[error("no frames were captured")]
    NoFramesCaptured,
    #[error("failed to finalize recording: {0}")]
    FinalizeFailed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
    Finalizing,
}

type LoggerFactory = Box<dyn Fn() -> Box<dyn PipelineLogger> + Send + Sync>;

/// Everything owned by a running recording.
struct ActiveCapture {
    device: Box<dyn CaptureDevice>,
    synchronizer: StreamSynchronizer<FrameProcessor>,
    output_path: PathBuf,
}

enum Inner {
    Idle,
    Capturing(ActiveCapture),
    Finalizing,
}

/// Drives one recording at a time: `Idle → Capturing → Finalizing → Idle`.
///
/// `start` and `stop` may be called from any thread. Per-frame work runs on
/// the synchronizer thread; finalization runs on its own thread and reports
/// through the completion passed to `stop`.
pub struct CaptureSession {
    provider: Arc<dyn CameraProvider>,
    encoder_factory: Arc<dyn EncoderFactory>,
    settings: CaptureSettings,
    logger_factory: LoggerFactory,
    inner: Arc<Mutex<Inner>>,
}

impl CaptureSession {
    pub fn new(
        provider: Arc<dyn CameraProvider>,
        encoder_factory: Arc<dyn EncoderFactory>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            provider,
            encoder_factory,
            settings,
            logger_factory: Box::new(|| Box::new(StdoutPipelineLogger::new())),
            inner: Arc::new(Mutex::new(Inner::Idle)),
        }
    }

    /// Replaces the per-recording logger. Called once per `start`.
    pub fn with_logger<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn PipelineLogger> + Send + Sync + 'static,
    {
        self.logger_factory = Box::new(factory);
        self
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    pub fn state(&self) -> SessionState {
        match *lock(&self.inner) {
            Inner::Idle => SessionState::Idle,
            Inner::Capturing(_) => SessionState::Capturing,
            Inner::Finalizing => SessionState::Finalizing,
        }
    }

    pub fn start(&self) -> Result<(), SessionError> {
        let mut inner = lock(&self.inner);
        if !matches!(*inner, Inner::Idle) {
            return Err(SessionError::AlreadyActive);
        }

        let preference = CameraPreference {
            fps: self.settings.fps(),
            depth_filtering: self.settings.depth_filtering,
            ..CameraPreference::default()
        };
        let mut device = self.provider.open(&preference).map_err(|e| {
            log::warn!("Cannot start capture: {e}");
            SessionError::CapabilityUnavailable(e)
        })?;

        let output_path = self.settings.next_output_path();
        let processor = self.build_processor(output_path.clone());
        let synchronizer = StreamSynchronizer::spawn(processor, self.settings.queue_capacity)
            .map_err(|e| SessionError::AttachFailed(e.to_string()))?;

        if let Err(e) = device.start_streaming(synchronizer.sink()) {
            log::warn!("Cannot attach {}: {e}", device.description());
            if let Err(join_err) = synchronizer.join() {
                log::warn!("{join_err}");
            }
            return Err(SessionError::AttachFailed(e.to_string()));
        }

        log::info!(
            "Capture started: {} -> {}",
            device.description(),
            output_path.display()
        );
        *inner = Inner::Capturing(ActiveCapture {
            device,
            synchronizer,
            output_path,
        });
        Ok(())
    }

    /// Ends the recording. Delivery halts before this returns; the
    /// completion runs later on the finalize thread.
    pub fn stop<F>(&self, completion: F)
    where
        F: FnOnce(Result<PathBuf, SessionError>) + Send + 'static,
    {
        let active = {
            let mut inner = lock(&self.inner);
            match std::mem::replace(&mut *inner, Inner::Finalizing) {
                Inner::Capturing(active) => active,
                other => {
                    *inner = other;
                    drop(inner);
                    completion(Err(SessionError::NotCapturing));
                    return;
                }
            }
        };

        let ActiveCapture {
            mut device,
            synchronizer,
            output_path,
        } = active;
        synchronizer.stop_accepting();
        device.stop_streaming();
        drop(device);
        let joined = synchronizer.join();
        log::info!("Capture stopped, finalizing {}", output_path.display());

        let inner = self.inner.clone();
        std::thread::spawn(move || {
            let result = match joined {
                Ok((processor, stats)) => {
                    log_sync_stats(&stats);
                    processor.finish().map(|file| {
                        log::info!(
                            "Recording saved: {} ({} frames)",
                            file.path.display(),
                            file.frames
                        );
                        file.path
                    })
                }
                Err(e) => {
                    log::warn!("{e}");
                    Err(SessionError::FinalizeFailed(e.to_string()))
                }
            };
            if let Err(e) = &result {
                log::warn!("Recording failed: {e}");
            }
            *lock(&inner) = Inner::Idle;
            completion(result);
        });
    }

    /// `stop`, waiting for the finalize thread to report.
    pub fn stop_blocking(&self) -> Result<PathBuf, SessionError> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.stop(move |result| {
            let _ = tx.send(result);
        });
        rx.recv().unwrap_or_else(|_| {
            Err(SessionError::FinalizeFailed(
                "finalize thread exited without a result".to_string(),
            ))
        })
    }

    fn build_processor(&self, output_path: PathBuf) -> FrameProcessor {
        let processor = FrameProcessor::new(
            self.encoder_factory.clone(),
            Box::new(GrayscaleNormalizer::new(self.settings.depth_range())),
            Box::new(SideBySideCompositor::new()),
            (self.logger_factory)(),
            output_path,
            self.settings.fps(),
        );
        match &self.settings.snapshot_path {
            Some(path) => processor.with_snapshot(path.clone(), Box::new(ImageFileWriter::new())),
            None => processor,
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.state() == SessionState::Capturing {
            self.stop(|result| {
                if let Ok(path) = result {
                    log::info!("Recording saved on shutdown: {}", path.display());
                }
            });
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn log_sync_stats(stats: &SyncStats) {
    log::info!(
        "Synchronizer: {} pairs delivered, {} dropped (incomplete {}, malformed {}, out of order {}, queue full {}, after stop {})",
        stats.delivered,
        stats.dropped(),
        stats.dropped_incomplete,
        stats.dropped_malformed,
        stats.dropped_out_of_order,
        stats.dropped_queue_full,
        stats.dropped_after_stop
    );
}
