//! Synthetic frame source (`stub://`).
//!
//! Produces an endless stream of gradient frames of a fixed size. Used by
//! tests and by the daemon when no camera is attached.

use crate::error::Result;
use crate::frame::Frame;

use super::{FrameSource, SourceStats};

pub struct SyntheticSource {
    location: String,
    width: u32,
    height: u32,
    frame_count: u64,
    scene_state: u8,
}

impl SyntheticSource {
    pub fn new(location: &str, width: u32, height: u32) -> Self {
        Self {
            location: location.to_string(),
            width,
            height,
            frame_count: 0,
            scene_state: 0,
        }
    }

    fn generate_pixels(&mut self) -> Vec<u8> {
        let pixel_count = self.width as usize * self.height as usize * 3;
        // Shift the pattern occasionally so consecutive runs are not identical.
        if self.frame_count % 50 == 0 {
            self.scene_state = self.scene_state.wrapping_add(1);
        }
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            *pixel = ((i as u64 + self.frame_count + self.scene_state as u64) % 256) as u8;
        }
        pixels
    }
}

impl FrameSource for SyntheticSource {
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to {} ({}x{})",
            self.location,
            self.width,
            self.height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        self.frame_count += 1;
        let pixels = self.generate_pixels();
        let frame =
            Frame::from_rgb(pixels, self.width, self.height).map_err(crate::Error::Capture)?;
        Ok(Some(frame))
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            location: self.location.clone(),
        }
    }
}
