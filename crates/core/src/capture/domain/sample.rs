use crate::shared::depth_map::DepthMap;
use crate::shared::pixel_buffer::PixelBuffer;
use crate::shared::timestamp::Timestamp;

/// Why the platform failed to produce one member of a synchronized bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    LateData,
    OutOfBuffers,
    Discontinuity,
    /// The platform reported no sample for this stream at this time.
    Missing,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VideoSample {
    Frame(PixelBuffer),
    Dropped(DropReason),
}

/// Depth as delivered by the sensor, before conversion to meters.
#[derive(Clone, Debug, PartialEq)]
pub enum RawDepthData {
    /// Distance in meters per pixel; the canonical format.
    Depth32(DepthMap),
    /// Inverse distance (1/meters) per pixel.
    Disparity32(DepthMap),
}

impl RawDepthData {
    /// Converts to a metric depth map. Non-positive or non-finite disparity
    /// becomes NaN (invalid).
    pub fn into_meters(self) -> DepthMap {
        match self {
            RawDepthData::Depth32(map) => map,
            RawDepthData::Disparity32(mut map) => {
                for v in map.data_mut() {
                    *v = if v.is_finite() && *v > 0.0 {
                        1.0 / *v
                    } else {
                        f32::NAN
                    };
                }
                map
            }
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            RawDepthData::Depth32(m) | RawDepthData::Disparity32(m) => m.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            RawDepthData::Depth32(m) | RawDepthData::Disparity32(m) => m.height(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DepthSample {
    Data(RawDepthData),
    Dropped(DropReason),
}

/// Everything the platform delivered for one synchronization epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBundle {
    pub timestamp: Timestamp,
    pub video: VideoSample,
    pub depth: DepthSample,
}

impl SampleBundle {
    pub fn complete(timestamp: Timestamp, video: PixelBuffer, depth: RawDepthData) -> Self {
        Self {
            timestamp,
            video: VideoSample::Frame(video),
            depth: DepthSample::Data(depth),
        }
    }
}

/// A validated video + metric depth pair sharing one capture timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncedPair {
    pub timestamp: Timestamp,
    pub video: PixelBuffer,
    pub depth: DepthMap,
}
