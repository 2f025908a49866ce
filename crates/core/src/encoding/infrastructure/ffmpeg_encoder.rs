use std::path::PathBuf;

use crate::encoding::domain::video_encoder::{
    EncodedFile, EncodeError, EncoderConfig, EncoderFactory, EncoderSession,
};
use crate::shared::pixel_buffer::{PixelBuffer, BGRA_CHANNELS};
use crate::shared::timestamp::Timestamp;

type BoxError = Box<dyn std::error::Error>;

/// Opens MPEG-4 encoder sessions via ffmpeg-next. The container follows the
/// output path's extension.
pub struct FfmpegEncoderFactory;

impl FfmpegEncoderFactory {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FfmpegEncoderFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EncoderFactory for FfmpegEncoderFactory {
    fn configure(&self, config: &EncoderConfig) -> Result<Box<dyn EncoderSession>, EncodeError> {
        let session = FfmpegEncoderSession::open(config).map_err(|e| EncodeError::Configure {
            width: config.width,
            height: config.height,
            reason: e.to_string(),
        })?;
        Ok(Box::new(session))
    }
}

/// Encodes BGRA frames to a single video track; no audio stream is created.
pub struct FfmpegEncoderSession {
    path: PathBuf,
    octx: ffmpeg_next::format::context::Output,
    encoder: ffmpeg_next::codec::encoder::video::Encoder,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    fps: i32,
    stream_time_base: ffmpeg_next::Rational,
    start: Option<Timestamp>,
    last_pts: Option<i64>,
    frames: usize,
    finished: bool,
}

// Safety: a session is owned by exactly one thread at a time (the capture
// thread while recording, then the finalize thread). The raw pointers inside
// ffmpeg types are never shared.
unsafe impl Send for FfmpegEncoderSession {}

impl FfmpegEncoderSession {
    fn open(config: &EncoderConfig) -> Result<Self, BoxError> {
        ffmpeg_next::init()?;

        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut octx = ffmpeg_next::format::output(&config.path)?;

        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4)
            .ok_or("MPEG4 encoder not found")?;

        let mut ost = octx.add_stream(Some(codec))?;

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()?;

        let fps = config.fps.max(1) as i32;
        encoder_ctx.set_width(config.width);
        encoder_ctx.set_height(config.height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));

        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder_ctx.open_with(ffmpeg_next::Dictionary::new())?;
        ost.set_parameters(&encoder);

        octx.write_header()?;
        let stream_time_base = octx.stream(0).ok_or("output stream missing")?.time_base();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::BGRA,
            config.width,
            config.height,
            ffmpeg_next::format::Pixel::YUV420P,
            config.width,
            config.height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        log::info!(
            "Encoder ready: {}x{} @ {fps} fps -> {}",
            config.width,
            config.height,
            config.path.display()
        );

        Ok(Self {
            path: config.path.clone(),
            octx,
            encoder,
            scaler,
            width: config.width,
            height: config.height,
            fps,
            stream_time_base,
            start: None,
            last_pts: None,
            frames: 0,
            finished: false,
        })
    }

    fn encode(&mut self, frame: &PixelBuffer, pts: i64) -> Result<(), BoxError> {
        let mut bgra = ffmpeg_next::util::frame::video::Video::new(
            ffmpeg_next::format::Pixel::BGRA,
            self.width,
            self.height,
        );

        let stride = bgra.stride(0);
        let row_bytes = self.width as usize * BGRA_CHANNELS;
        let dst = bgra.data_mut(0);
        for (row, src) in frame.data().chunks_exact(row_bytes).enumerate() {
            dst[row * stride..row * stride + row_bytes].copy_from_slice(src);
        }

        let mut yuv = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&bgra, &mut yuv)?;
        yuv.set_pts(Some(pts));

        self.encoder.send_frame(&yuv)?;
        self.drain_packets()
    }

    fn drain_packets(&mut self) -> Result<(), BoxError> {
        let mut encoded = ffmpeg_next::Packet::empty();
        while self.encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, self.fps), self.stream_time_base);
            encoded.write_interleaved(&mut self.octx)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BoxError> {
        self.encoder.send_eof()?;
        self.drain_packets()?;
        self.octx.write_trailer()?;
        Ok(())
    }
}

impl EncoderSession for FfmpegEncoderSession {
    fn is_ready(&self) -> bool {
        !self.finished
    }

    fn start_session(&mut self, at: Timestamp) {
        self.start = Some(at);
    }

    fn append(&mut self, frame: &PixelBuffer, timestamp: Timestamp) -> Result<(), EncodeError> {
        if self.finished {
            return Err(EncodeError::InputFinished);
        }
        let start = self.start.ok_or(EncodeError::SessionNotStarted)?;
        if frame.width() != self.width || frame.height() != self.height {
            return Err(EncodeError::FrameSize {
                expected_w: self.width,
                expected_h: self.height,
                actual_w: frame.width(),
                actual_h: frame.height(),
            });
        }

        let pts = next_pts(start, timestamp, self.fps, self.last_pts);
        self.encode(frame, pts).map_err(|e| EncodeError::Append {
            timestamp,
            reason: e.to_string(),
        })?;
        self.last_pts = Some(pts);
        self.frames += 1;
        Ok(())
    }

    fn mark_input_finished(&mut self) {
        self.finished = true;
    }

    fn finalize(mut self: Box<Self>) -> Result<EncodedFile, EncodeError> {
        self.finished = true;
        self.flush().map_err(|e| EncodeError::Finalize {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        log::info!("Wrote {} frames to {}", self.frames, self.path.display());
        Ok(EncodedFile {
            path: self.path.clone(),
            frames: self.frames,
        })
    }
}

/// Presentation timestamp in `1/fps` units relative to the session start,
/// bumped forward when two captures land in the same tick.
fn next_pts(start: Timestamp, timestamp: Timestamp, fps: i32, last: Option<i64>) -> i64 {
    let elapsed = timestamp.saturating_since(start).as_secs_f64();
    let pts = (elapsed * fps as f64).round() as i64;
    match last {
        Some(prev) if pts <= prev => prev + 1,
        _ => pts,
    }
}
