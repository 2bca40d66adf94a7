//! Local image file source.
//!
//! A path to one image yields that frame once. A path to a directory yields
//! every `.jpg`, `.jpeg` and `.png` in it, sorted by file name. No URL schemes.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::error::{Error, Result};
use crate::frame::Frame;

use super::{FrameSource, SourceStats};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub struct ImageFileSource {
    path: PathBuf,
    pending: Vec<PathBuf>,
    connected: bool,
    frame_count: u64,
    last_error: Option<String>,
}

impl ImageFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pending: Vec::new(),
            connected: false,
            frame_count: 0,
            last_error: None,
        }
    }

    /// Paths still to be read, in delivery order.
    pub fn remaining(&self) -> &[PathBuf] {
        &self.pending
    }
}

impl FrameSource for ImageFileSource {
    fn connect(&mut self) -> Result<()> {
        let mut paths = if self.path.is_dir() {
            list_images(&self.path).map_err(Error::Capture)?
        } else {
            vec![self.path.clone()]
        };
        paths.sort();
        // Popped from the back.
        paths.reverse();
        self.pending = paths;
        self.connected = true;
        log::info!(
            "ImageFileSource: connected to {} ({} images)",
            self.path.display(),
            self.pending.len()
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if !self.connected {
            self.connect()?;
        }
        let Some(path) = self.pending.pop() else {
            return Ok(None);
        };
        self.frame_count += 1;
        match Frame::open(&path) {
            Ok(frame) => {
                self.last_error = None;
                Ok(Some(frame))
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.last_error.is_none()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            location: self.path.display().to_string(),
        }
    }
}

fn list_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_image {
            paths.push(path);
        }
    }
    Ok(paths)
}
