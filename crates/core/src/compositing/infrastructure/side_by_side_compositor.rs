use crate::compositing::domain::frame_compositor::{CompositeError, FrameCompositor};
use crate::shared::pixel_buffer::PixelBuffer;

/// Places `left` at column 0 and `right` immediately after it.
///
/// Both inputs are opaque, so this is a straight row-by-row copy with no
/// blending or scaling.
pub struct SideBySideCompositor;

impl SideBySideCompositor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SideBySideCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCompositor for SideBySideCompositor {
    fn composite(
        &self,
        left: &PixelBuffer,
        right: &PixelBuffer,
        into: &mut PixelBuffer,
    ) -> Result<(), CompositeError> {
        if left.height() != right.height() {
            return Err(CompositeError::HeightMismatch {
                left_h: left.height(),
                right_h: right.height(),
            });
        }

        let expected_w = left.width() as u64 + right.width() as u64;
        if into.width() as u64 != expected_w || into.height() != left.height() {
            return Err(CompositeError::DestinationMismatch {
                expected_w: expected_w.min(u32::MAX as u64) as u32,
                expected_h: left.height(),
                actual_w: into.width(),
                actual_h: into.height(),
            });
        }

        let left_stride = left.stride();
        let right_stride = right.stride();
        let dst_stride = into.stride();
        if dst_stride == 0 {
            return Ok(());
        }
        let dst = into.data_mut();

        for (y, dst_row) in dst.chunks_exact_mut(dst_stride).enumerate() {
            let (dst_left, dst_right) = dst_row.split_at_mut(left_stride);
            dst_left.copy_from_slice(left.row(y));
            dst_right.copy_from_slice(&right.data()[y * right_stride..(y + 1) * right_stride]);
        }

        Ok(())
    }
}
