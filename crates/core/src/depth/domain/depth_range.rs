use crate::shared::constants::{DEFAULT_MAX_DEPTH_METERS, DEFAULT_MIN_DEPTH_METERS};

/// Distance window mapped linearly onto 0..=255 luminance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthRange {
    pub min: f32,
    pub max: f32,
}

impl DepthRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Luminance for one depth sample. Invalid samples, and every sample
    /// when the window is empty or inverted, map to 0.
    #[inline]
    pub fn luminance(&self, meters: f32) -> u8 {
        let span = self.span();
        if !meters.is_finite() || !(span > 0.0) {
            return 0;
        }
        let clamped = meters.clamp(self.min, self.max);
        ((clamped - self.min) / span * 255.0) as u8
    }
}

impl Default for DepthRange {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DEPTH_METERS, DEFAULT_MAX_DEPTH_METERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::at_min(0.25, 0)]
    #[case::below_min(0.1, 0)]
    #[case::zero(0.0, 0)]
    #[case::negative(-3.0, 0)]
    #[case::at_max(5.0, 255)]
    #[case::beyond_max(12.0, 255)]
    #[case::midpoint_truncates(2.625, 127)]
    #[case::one_meter(1.0, 40)]
    #[case::nan(f32::NAN, 0)]
    #[case::pos_inf(f32::INFINITY, 0)]
    #[case::neg_inf(f32::NEG_INFINITY, 0)]
    fn test_default_range_luminance(#[case] meters: f32, #[case] expected: u8) {
        assert_eq!(DepthRange::default().luminance(meters), expected);
    }

    #[rstest]
    #[case::empty(DepthRange::new(2.0, 2.0))]
    #[case::inverted(DepthRange::new(5.0, 0.25))]
    #[case::nan_bound(DepthRange::new(f32::NAN, 5.0))]
    fn test_non_positive_span_is_black(#[case] range: DepthRange) {
        assert_eq!(range.luminance(1.0), 0);
        assert_eq!(range.luminance(3.0), 0);
    }

    #[test]
    fn test_luminance_is_monotonic() {
        let range = DepthRange::default();
        let mut previous = 0;
        for i in 0..=480 {
            let meters = 0.25 + i as f32 * 0.01;
            let lum = range.luminance(meters);
            assert!(lum >= previous, "luminance dropped at {meters}m");
            previous = lum;
        }
        assert_eq!(previous, 255);
    }
}
