use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::capture::domain::sample::SyncedPair;
use crate::capture::stream_synchronizer::PairHandler;
use crate::compositing::domain::frame_compositor::FrameCompositor;
use crate::depth::domain::depth_normalizer::{DepthNormalizer, NormalizeError};
use crate::encoding::domain::image_writer::ImageWriter;
use crate::encoding::domain::video_encoder::{
    EncodedFile, EncoderConfig, EncoderFactory, EncoderSession,
};
use crate::pipeline::capture_session::SessionError;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::composite_layout::CompositeLayout;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::timestamp::Timestamp;

/// Why a synchronized pair did not reach the encoder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropCause {
    /// Video and depth disagree on height, or one is empty.
    InconsistentPair,
    Allocation,
    /// Encoder construction failed; retried on the next pair.
    EncoderUnavailable,
    /// Pair geometry differs from the dimensions fixed at the first frame.
    DimensionMismatch,
    NotReady,
    StaleTimestamp,
    Composite,
    Append,
}

impl DropCause {
    pub fn label(&self) -> &'static str {
        match self {
            DropCause::InconsistentPair => "inconsistent_pair",
            DropCause::Allocation => "allocation",
            DropCause::EncoderUnavailable => "encoder_unavailable",
            DropCause::DimensionMismatch => "dimension_mismatch",
            DropCause::NotReady => "not_ready",
            DropCause::StaleTimestamp => "stale_timestamp",
            DropCause::Composite => "composite",
            DropCause::Append => "append",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Submitted(Timestamp),
    Dropped(DropCause),
}

/// Output resources created by the first usable pair. Their dimensions
/// never change afterwards.
struct ActiveOutput {
    layout: CompositeLayout,
    composite: PixelBuffer,
    encoder: Box<dyn EncoderSession>,
}

/// Per-frame work for one recording: normalize → composite → encode.
///
/// Owned by the synchronizer thread while capturing, then moved to the
/// finalize thread. Every failure drops the current frame and nothing else.
pub struct FrameProcessor {
    factory: Arc<dyn EncoderFactory>,
    normalizer: Box<dyn DepthNormalizer>,
    compositor: Box<dyn FrameCompositor>,
    logger: Box<dyn PipelineLogger>,
    snapshot: Option<(PathBuf, Box<dyn ImageWriter>)>,
    snapshot_thread: Option<JoinHandle<()>>,
    output_path: PathBuf,
    fps: u32,
    output: Option<ActiveOutput>,
    start: Option<Timestamp>,
    last_submitted: Option<Timestamp>,
    submitted: usize,
}

impl FrameProcessor {
    pub fn new(
        factory: Arc<dyn EncoderFactory>,
        normalizer: Box<dyn DepthNormalizer>,
        compositor: Box<dyn FrameCompositor>,
        logger: Box<dyn PipelineLogger>,
        output_path: PathBuf,
        fps: u32,
    ) -> Self {
        Self {
            factory,
            normalizer,
            compositor,
            logger,
            snapshot: None,
            snapshot_thread: None,
            output_path,
            fps,
            output: None,
            start: None,
            last_submitted: None,
            submitted: 0,
        }
    }

    /// Also save the first submitted composite as an image.
    pub fn with_snapshot(mut self, path: PathBuf, writer: Box<dyn ImageWriter>) -> Self {
        self.snapshot = Some((path, writer));
        self
    }

    pub fn layout(&self) -> Option<CompositeLayout> {
        self.output.as_ref().map(|o| o.layout)
    }

    pub fn start_timestamp(&self) -> Option<Timestamp> {
        self.start
    }

    pub fn submitted(&self) -> usize {
        self.submitted
    }

    pub fn process(&mut self, pair: SyncedPair) -> FrameOutcome {
        let timestamp = pair.timestamp;
        match self.try_process(pair) {
            Ok(()) => {
                self.logger.frame_submitted();
                FrameOutcome::Submitted(timestamp)
            }
            Err(cause) => {
                log::debug!("Dropped frame at {timestamp}: {}", cause.label());
                self.logger.frame_dropped(cause.label());
                FrameOutcome::Dropped(cause)
            }
        }
    }

    fn try_process(&mut self, pair: SyncedPair) -> Result<(), DropCause> {
        if self.output.is_none() {
            self.output = Some(self.open_output(&pair)?);
        }
        let output = self.output.as_mut().ok_or(DropCause::EncoderUnavailable)?;

        if !output.layout.matches(&pair.video, &pair.depth) {
            log::warn!(
                "Dropping {}x{} + {}x{} pair: recording is fixed at {}x{} + {}x{}",
                pair.video.width(),
                pair.video.height(),
                pair.depth.width(),
                pair.depth.height(),
                output.layout.video_width,
                output.layout.height,
                output.layout.depth_width,
                output.layout.height
            );
            return Err(DropCause::DimensionMismatch);
        }

        if !output.encoder.is_ready() {
            return Err(DropCause::NotReady);
        }

        if self
            .last_submitted
            .is_some_and(|last| pair.timestamp <= last)
        {
            return Err(DropCause::StaleTimestamp);
        }

        let t = Instant::now();
        let gray = self
            .normalizer
            .normalize(&pair.depth)
            .map_err(|e| match e {
                NormalizeError::Allocation(_) => DropCause::Allocation,
                NormalizeError::DestinationMismatch { .. } => DropCause::InconsistentPair,
            })?;
        self.logger.timing("normalize", elapsed_ms(t));

        let t = Instant::now();
        self.compositor
            .composite(&pair.video, &gray, &mut output.composite)
            .map_err(|_| DropCause::Composite)?;
        self.logger.timing("composite", elapsed_ms(t));

        if self.start.is_none() {
            self.start = Some(pair.timestamp);
            output.encoder.start_session(pair.timestamp);
            self.logger
                .info(&format!("Recording started at {}", pair.timestamp));
        }

        let t = Instant::now();
        if let Err(e) = output.encoder.append(&output.composite, pair.timestamp) {
            log::debug!("Encoder rejected frame: {e}");
            // The timeline starts at the first frame the encoder accepts.
            if self.submitted == 0 {
                self.start = None;
            }
            return Err(DropCause::Append);
        }
        self.logger.timing("append", elapsed_ms(t));

        self.last_submitted = Some(pair.timestamp);
        self.submitted += 1;

        if let Some((path, writer)) = self.snapshot.take() {
            self.snapshot_thread = spawn_snapshot(path, writer, output.composite.clone());
        }

        Ok(())
    }

    /// One-shot transition from "no dimensions" to a fixed layout with an
    /// allocated composite buffer and an open encoder. Nothing is kept
    /// unless every step succeeds.
    fn open_output(&self, pair: &SyncedPair) -> Result<ActiveOutput, DropCause> {
        let layout = CompositeLayout::from_pair(&pair.video, &pair.depth)
            .ok_or(DropCause::InconsistentPair)?;

        let composite = PixelBuffer::try_zeroed(layout.width(), layout.height).map_err(|e| {
            log::warn!("{e}");
            DropCause::Allocation
        })?;

        let config = EncoderConfig {
            path: self.output_path.clone(),
            width: layout.width(),
            height: layout.height,
            fps: self.fps,
        };
        let encoder = self.factory.configure(&config).map_err(|e| {
            log::warn!("Encoder construction failed, retrying on next frame: {e}");
            remove_partial_file(&self.output_path);
            DropCause::EncoderUnavailable
        })?;

        log::info!(
            "Output fixed at {}x{} ({} video + {} depth)",
            layout.width(),
            layout.height,
            layout.video_width,
            layout.depth_width
        );
        Ok(ActiveOutput {
            layout,
            composite,
            encoder,
        })
    }

    /// Closes the encoder and releases the composite buffer. Blocking.
    ///
    /// A recording that never wrote a frame is an error, and any file the
    /// encoder created is removed.
    pub fn finish(mut self) -> Result<EncodedFile, SessionError> {
        self.logger.summary();
        if let Some(handle) = self.snapshot_thread.take() {
            if handle.join().is_err() {
                log::warn!("Snapshot thread panicked");
            }
        }

        let Some(output) = self.output.take() else {
            remove_partial_file(&self.output_path);
            return Err(SessionError::NoFramesCaptured);
        };
        let ActiveOutput {
            mut encoder,
            composite,
            ..
        } = output;

        encoder.mark_input_finished();
        let result = if self.submitted == 0 {
            if let Err(e) = encoder.finalize() {
                log::debug!("Finalizing empty recording: {e}");
            }
            Err(SessionError::NoFramesCaptured)
        } else {
            encoder
                .finalize()
                .map_err(|e| SessionError::FinalizeFailed(e.to_string()))
        };
        drop(composite);

        if result.is_err() {
            remove_partial_file(&self.output_path);
        }
        result
    }
}

impl PairHandler for FrameProcessor {
    fn on_pair(&mut self, pair: SyncedPair) {
        self.process(pair);
    }
}

/// Writes the snapshot off the capture thread.
fn spawn_snapshot(
    path: PathBuf,
    writer: Box<dyn ImageWriter>,
    frame: PixelBuffer,
) -> Option<JoinHandle<()>> {
    let spawned = std::thread::Builder::new()
        .name("depthcam-snapshot".to_string())
        .spawn(move || match writer.write(&path, &frame) {
            Ok(()) => log::info!("Snapshot saved to {}", path.display()),
            Err(e) => log::warn!("Snapshot to {} failed: {e}", path.display()),
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            log::warn!("Could not start snapshot thread: {e}");
            None
        }
    }
}

fn remove_partial_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            log::warn!("Could not remove {}: {e}", path.display());
        }
    }
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
