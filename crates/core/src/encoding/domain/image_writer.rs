use std::path::Path;

use crate::shared::pixel_buffer::PixelBuffer;

/// Writes a single frame to an image file.
pub trait ImageWriter: Send {
    fn write(&self, path: &Path, frame: &PixelBuffer) -> Result<(), Box<dyn std::error::Error>>;
}
