use ndarray::{Axis, Zip};

use crate::depth::domain::depth_normalizer::{DepthNormalizer, NormalizeError};
use crate::depth::domain::depth_range::DepthRange;
use crate::shared::depth_map::DepthMap;
use crate::shared::pixel_buffer::PixelBuffer;

/// Maps depth linearly to gray: near is black, far is white, invalid is black.
pub struct GrayscaleNormalizer {
    range: DepthRange,
}

impl GrayscaleNormalizer {
    pub fn new(range: DepthRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> DepthRange {
        self.range
    }
}

impl Default for GrayscaleNormalizer {
    fn default() -> Self {
        Self::new(DepthRange::default())
    }
}

impl DepthNormalizer for GrayscaleNormalizer {
    fn normalize_into(
        &self,
        depth: &DepthMap,
        out: &mut PixelBuffer,
    ) -> Result<(), NormalizeError> {
        if out.width() != depth.width() || out.height() != depth.height() {
            return Err(NormalizeError::DestinationMismatch {
                expected_w: depth.width(),
                expected_h: depth.height(),
                actual_w: out.width(),
                actual_h: out.height(),
            });
        }

        let range = self.range;
        let src = depth.as_ndarray();
        let mut dst = out.as_ndarray_mut();

        // Row-independent: every output pixel depends on exactly one input.
        Zip::from(&src)
            .and(dst.lanes_mut(Axis(2)))
            .for_each(|&meters, mut px| {
                let lum = range.luminance(meters);
                px[0] = lum;
                px[1] = lum;
                px[2] = lum;
                px[3] = u8::MAX;
            });

        Ok(())
    }
}
