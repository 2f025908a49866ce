use crate::shared::depth_map::DepthMap;
use crate::shared::pixel_buffer::PixelBuffer;

/// Geometry of the side-by-side output: video on the left, depth on the right.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompositeLayout {
    pub video_width: u32,
    pub depth_width: u32,
    pub height: u32,
}

impl CompositeLayout {
    /// Derives the layout from a synchronized pair, or `None` when the two
    /// streams disagree on height or either is empty.
    pub fn from_pair(video: &PixelBuffer, depth: &DepthMap) -> Option<Self> {
        if video.is_empty() || depth.is_empty() || video.height() != depth.height() {
            return None;
        }
        let layout = Self {
            video_width: video.width(),
            depth_width: depth.width(),
            height: video.height(),
        };
        layout.video_width.checked_add(layout.depth_width)?;
        Some(layout)
    }

    pub fn width(&self) -> u32 {
        self.video_width + self.depth_width
    }

    /// Whether a pair has exactly the per-stream dimensions this layout
    /// was fixed with.
    pub fn matches(&self, video: &PixelBuffer, depth: &DepthMap) -> bool {
        video.width() == self.video_width
            && depth.width() == self.depth_width
            && video.height() == self.height
            && depth.height() == self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pair_sums_widths() {
        let video = PixelBuffer::filled(512, 960, [0, 0, 0, 255]);
        let depth = DepthMap::filled(256, 960, 1.0);
        let layout = CompositeLayout::from_pair(&video, &depth).unwrap();
        assert_eq!(layout.width(), 768);
        assert_eq!(layout.height, 960);
    }

    #[test]
    fn test_from_pair_rejects_height_mismatch() {
        let video = PixelBuffer::filled(4, 4, [0; 4]);
        let depth = DepthMap::filled(2, 3, 1.0);
        assert!(CompositeLayout::from_pair(&video, &depth).is_none());
    }

    #[test]
    fn test_from_pair_rejects_empty_stream() {
        let video = PixelBuffer::filled(4, 4, [0; 4]);
        let depth = DepthMap::new(Vec::new(), 0, 4);
        assert!(CompositeLayout::from_pair(&video, &depth).is_none());
    }

    #[test]
    fn test_matches_requires_identical_geometry() {
        let video = PixelBuffer::filled(4, 2, [0; 4]);
        let depth = DepthMap::filled(2, 2, 1.0);
        let layout = CompositeLayout::from_pair(&video, &depth).unwrap();
        assert!(layout.matches(&video, &depth));

        let wider = DepthMap::filled(3, 2, 1.0);
        assert!(!layout.matches(&video, &wider));
    }
}
