use std::path::Path;

use crate::encoding::domain::image_writer::ImageWriter;
use crate::shared::pixel_buffer::{PixelBuffer, BGRA_CHANNELS};

/// Saves a BGRA frame with the `image` crate; format follows the extension.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &PixelBuffer) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut rgba = frame.data().to_vec();
        for px in rgba.chunks_exact_mut(BGRA_CHANNELS) {
            px.swap(0, 2);
        }

        let img = image::RgbaImage::from_raw(frame.width(), frame.height(), rgba)
            .ok_or("Failed to create image from frame data")?;
        img.save(path)?;
        Ok(())
    }
}
