use thiserror::Error;

use crate::shared::pixel_buffer::PixelBuffer;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositeError {
    #[error("left is {left_h} rows tall, right is {right_h}")]
    HeightMismatch { left_h: u32, right_h: u32 },
    #[error("destination is {actual_w}x{actual_h}, expected {expected_w}x{expected_h}")]
    DestinationMismatch {
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },
}

/// Combines two equal-height images into a caller-owned destination.
///
/// Implementations write into `into` in place and never resize it; on error
/// the destination is left untouched.
pub trait FrameCompositor: Send {
    fn composite(
        &self,
        left: &PixelBuffer,
        right: &PixelBuffer,
        into: &mut PixelBuffer,
    ) -> Result<(), CompositeError>;
}
