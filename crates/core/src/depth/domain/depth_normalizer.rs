use thiserror::Error;

use crate::shared::depth_map::DepthMap;
use crate::shared::pixel_buffer::{AllocationError, PixelBuffer};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error("destination is {actual_w}x{actual_h}, depth map is {expected_w}x{expected_h}")]
    DestinationMismatch {
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },
}

/// Turns a metric depth map into an opaque 4-channel image.
///
/// Implementations are stateless per call: the same input always yields the
/// same output.
pub trait DepthNormalizer: Send {
    /// Writes into an existing buffer of the same dimensions as `depth`.
    fn normalize_into(&self, depth: &DepthMap, out: &mut PixelBuffer)
        -> Result<(), NormalizeError>;

    fn normalize(&self, depth: &DepthMap) -> Result<PixelBuffer, NormalizeError> {
        let mut out = PixelBuffer::try_zeroed(depth.width(), depth.height())?;
        self.normalize_into(depth, &mut out)?;
        Ok(out)
    }
}
