use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::capture::domain::capture_device::{
    CameraPreference, CameraProvider, CaptureDevice, CaptureError,
};
use crate::capture::domain::sample::{
    DepthSample, DropReason, RawDepthData, SampleBundle, VideoSample,
};
use crate::capture::domain::sample_sink::SampleSink;
use crate::shared::constants::{DEFAULT_MAX_DEPTH_METERS, DEFAULT_MIN_DEPTH_METERS};
use crate::shared::depth_map::DepthMap;
use crate::shared::pixel_buffer::{PixelBuffer, BGRA_CHANNELS};
use crate::shared::timestamp::Timestamp;

/// Shape and behavior of the generated streams.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticCameraConfig {
    pub video_width: u32,
    pub video_height: u32,
    pub depth_width: u32,
    pub fps: u32,
    /// Columns at each edge of the depth map reported as invalid (NaN).
    pub invalid_border: u32,
    /// Every Nth bundle arrives with its depth member dropped.
    pub drop_depth_every: Option<u64>,
    /// Deliver inverse depth instead of meters.
    pub disparity: bool,
    /// Stop producing after this many bundles.
    pub frame_limit: Option<u64>,
    /// Fill invalid border columns from the nearest valid column.
    pub depth_filtering: bool,
}

impl Default for SyntheticCameraConfig {
    fn default() -> Self {
        Self {
            video_width: 512,
            video_height: 384,
            depth_width: 256,
            fps: 15,
            invalid_border: 4,
            drop_depth_every: None,
            disparity: false,
            frame_limit: None,
            depth_filtering: false,
        }
    }
}

impl SyntheticCameraConfig {
    /// Builds the bundle for frame `index` at timestamp `index / fps`.
    pub fn render_bundle(&self, index: u64) -> SampleBundle {
        let fps = self.fps.max(1) as i64;
        let timestamp = Timestamp::from_nanos(index as i64 * 1_000_000_000 / fps);

        let video = VideoSample::Frame(self.render_video(index));
        let depth = match self.drop_depth_every {
            Some(n) if n > 0 && index % n == n - 1 => DepthSample::Dropped(DropReason::LateData),
            _ => DepthSample::Data(self.render_depth(index)),
        };

        SampleBundle {
            timestamp,
            video,
            depth,
        }
    }

    fn render_video(&self, index: u64) -> PixelBuffer {
        let (w, h) = (self.video_width as usize, self.video_height as usize);
        let mut data = vec![0u8; w * h * BGRA_CHANNELS];
        let bar = (index as usize * 8) % w.max(1);
        for (y, row) in data.chunks_exact_mut(w * BGRA_CHANNELS).enumerate() {
            for (x, px) in row.chunks_exact_mut(BGRA_CHANNELS).enumerate() {
                let on_bar = x >= bar && x < bar + 8;
                px[0] = (x * 255 / w.max(1)) as u8;
                px[1] = (y * 255 / h.max(1)) as u8;
                px[2] = if on_bar { 255 } else { 0 };
                px[3] = 255;
            }
        }
        PixelBuffer::new(data, self.video_width, self.video_height)
    }

    fn render_depth(&self, index: u64) -> RawDepthData {
        let (w, h) = (self.depth_width as usize, self.video_height as usize);
        let span = DEFAULT_MAX_DEPTH_METERS - DEFAULT_MIN_DEPTH_METERS;
        let border = self.invalid_border as usize;
        let valid = border..w.saturating_sub(border);
        let mut data = Vec::with_capacity(w * h);
        for _y in 0..h {
            for x in 0..w {
                let source = if self.depth_filtering && !valid.is_empty() {
                    x.clamp(valid.start, valid.end - 1)
                } else {
                    x
                };
                let meters = if valid.contains(&source) {
                    let phase = ((source + index as usize) % w) as f32 / w as f32;
                    DEFAULT_MIN_DEPTH_METERS + span * phase
                } else {
                    f32::NAN
                };
                data.push(meters);
            }
        }
        let map = DepthMap::new(data, self.depth_width, self.video_height);
        if self.disparity {
            let inverted = map
                .data()
                .iter()
                .map(|m| if m.is_finite() { 1.0 / m } else { f32::NAN })
                .collect();
            RawDepthData::Disparity32(DepthMap::new(inverted, map.width(), map.height()))
        } else {
            RawDepthData::Depth32(map)
        }
    }
}

/// A capture device producing generated video + depth on a timer thread.
pub struct SyntheticCamera {
    config: SyntheticCameraConfig,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<u64>>,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticCameraConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl CaptureDevice for SyntheticCamera {
    fn description(&self) -> String {
        format!(
            "synthetic depth camera ({}x{} video, {}x{} depth @ {} fps{})",
            self.config.video_width,
            self.config.video_height,
            self.config.depth_width,
            self.config.video_height,
            self.config.fps,
            if self.config.depth_filtering { ", filtered" } else { "" }
        )
    }

    fn start_streaming(&mut self, sink: SampleSink) -> Result<(), CaptureError> {
        if self.handle.is_some() {
            return Err(CaptureError::AlreadyStreaming);
        }
        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let config = self.config.clone();
        let handle = std::thread::Builder::new()
            .name("depthcam-synthetic".to_string())
            .spawn(move || {
                let interval = Duration::from_secs_f64(1.0 / config.fps.max(1) as f64);
                let started = Instant::now();
                let mut index = 0u64;
                while running.load(Ordering::SeqCst)
                    && config.frame_limit.map_or(true, |limit| index < limit)
                {
                    sink.push(config.render_bundle(index));
                    index += 1;
                    let next = started + interval * index as u32;
                    if let Some(wait) = next.checked_duration_since(Instant::now()) {
                        std::thread::sleep(wait);
                    }
                }
                index
            })
            .map_err(|e| CaptureError::Attach {
                what: "output",
                reason: e.to_string(),
            })?;

        self.handle = Some(handle);
        Ok(())
    }

    fn stop_streaming(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(produced) => log::debug!("Synthetic camera produced {produced} bundles"),
                Err(_) => log::warn!("Synthetic camera thread panicked"),
            }
        }
    }
}

impl Drop for SyntheticCamera {
    fn drop(&mut self) {
        self.stop_streaming();
    }
}

/// Hands out `SyntheticCamera`s, or reports no depth hardware.
pub struct SyntheticCameraProvider {
    config: SyntheticCameraConfig,
    depth_available: bool,
}

impl SyntheticCameraProvider {
    pub fn new(config: SyntheticCameraConfig) -> Self {
        Self {
            config,
            depth_available: true,
        }
    }

    /// A provider on a device without a depth-capable camera.
    pub fn without_depth_camera() -> Self {
        Self {
            config: SyntheticCameraConfig::default(),
            depth_available: false,
        }
    }
}

impl CameraProvider for SyntheticCameraProvider {
    fn open(&self, preference: &CameraPreference) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        if !self.depth_available {
            return Err(CaptureError::NoDepthCamera);
        }
        let config = SyntheticCameraConfig {
            fps: preference.fps.max(1),
            depth_filtering: preference.depth_filtering,
            ..self.config.clone()
        };
        let camera = SyntheticCamera::new(config);
        log::info!("Opened {}", camera.description());
        Ok(Box::new(camera))
    }
}
