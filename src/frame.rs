//! In-memory frame buffers.
//!
//! - `Frame`: owned RGB8 pixel buffer plus capture time.
//!
//! Frames are created fresh by a source for every capture and are never shared
//! between iterations of the processing loop. Detectors only read them;
//! annotation always returns a new `Frame`.

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::path::Path;
use std::time::SystemTime;

use crate::ingest::normalize::{normalize_to_rgb, PixelFormat};

/// RGB8 frame. Channel layout is fixed; width and height are arbitrary.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
    captured_at: SystemTime,
}

impl Frame {
    /// Wrap packed RGB bytes. The length must be exactly `width * height * 3`.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("frame buffer does not fit {}x{}", width, height))?;
        Ok(Self::from_image(image))
    }

    /// Convert a camera buffer in `format` to RGB and wrap it.
    pub fn from_format(
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self> {
        let rgb = normalize_to_rgb(pixels, width, height, format)?;
        Self::from_rgb(rgb, width, height)
    }

    pub fn from_image(image: RgbImage) -> Self {
        Self {
            image,
            captured_at: SystemTime::now(),
        }
    }

    /// Solid-colour frame, mostly useful for tests and synthetic sources.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        Self::from_image(RgbImage::from_pixel(width, height, image::Rgb(rgb)))
    }

    /// Decode an image file (any format the `image` crate was built with).
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| crate::Error::FrameRead {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_image(decoded.into_rgb8()))
    }

    pub fn with_captured_at(mut self, captured_at: SystemTime) -> Self {
        self.captured_at = captured_at;
        self
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn captured_at(&self) -> SystemTime {
        self.captured_at
    }

    /// Packed RGB bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.image.get_pixel_checked(x, y).map(|p| p.0)
    }

    pub(crate) fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Encode as JPEG at `path`.
    pub fn save_jpeg<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        self.image
            .save_with_format(path, image::ImageFormat::Jpeg)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb_validates_length() {
        assert!(Frame::from_rgb(vec![0u8; 11], 2, 2).is_err());
        let frame = Frame::from_rgb(vec![7u8; 12], 2, 2).unwrap();
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.pixel(1, 1), Some([7, 7, 7]));
        assert_eq!(frame.pixel(2, 0), None);
    }

    #[test]
    fn open_missing_file_is_frame_read_error() {
        let err = Frame::open("/nonexistent/portal-watch/frame.jpg").unwrap_err();
        assert!(matches!(err, crate::Error::FrameRead { .. }));
        assert!(err.is_frame_local());
    }

    #[test]
    fn jpeg_save_and_reopen_keeps_dimensions() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frame.jpg");
        Frame::filled(32, 16, [10, 20, 30]).save_jpeg(&path)?;
        let reopened = Frame::open(&path)?;
        assert_eq!((reopened.width(), reopened.height()), (32, 16));
        Ok(())
    }

    #[test]
    fn capture_time_override_survives_clone() {
        let at = std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        let frame = Frame::filled(1, 1, [0, 0, 0]).with_captured_at(at);
        assert_eq!(frame.clone().captured_at(), at);
    }
}
