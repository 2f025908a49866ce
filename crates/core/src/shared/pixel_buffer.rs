use ndarray::{ArrayView3, ArrayViewMut3};
use thiserror::Error;

/// Bytes per pixel for every buffer in the pipeline (B, G, R, A).
pub const BGRA_CHANNELS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to allocate {bytes} bytes for a {width}x{height} pixel buffer")]
pub struct AllocationError {
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// A 4-channel 8-bit image: contiguous BGRA bytes in row-major order.
///
/// Used for camera video frames, normalized depth frames and the
/// side-by-side composite alike.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * BGRA_CHANNELS,
            "data length must equal width * height * 4"
        );
        Self {
            data,
            width,
            height,
        }
    }

    /// Allocates a zero-filled buffer, reporting allocation failure instead
    /// of aborting the process.
    pub fn try_zeroed(width: u32, height: u32) -> Result<Self, AllocationError> {
        let bytes = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(BGRA_CHANNELS))
            .ok_or(AllocationError {
                width,
                height,
                bytes: usize::MAX,
            })?;

        let mut data = Vec::new();
        data.try_reserve_exact(bytes).map_err(|_| AllocationError {
            width,
            height,
            bytes,
        })?;
        data.resize(bytes, 0);

        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Fills every pixel with the same BGRA value.
    pub fn filled(width: u32, height: u32, bgra: [u8; 4]) -> Self {
        let data = bgra
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * BGRA_CHANNELS)
            .collect();
        Self::new(data, width, height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * BGRA_CHANNELS
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn row(&self, y: usize) -> &[u8] {
        let stride = self.stride();
        &self.data[y * stride..(y + 1) * stride]
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * BGRA_CHANNELS;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("PixelBuffer data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("PixelBuffer data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, BGRA_CHANNELS)
    }
}
