//! Frame ingestion sources.
//!
//! This module provides different sources for frames:
//! - Local image files or directories of images (one-shot / batch)
//! - USB/V4L2 cameras (feature: ingest-v4l2)
//! - Synthetic source (`stub://`, testing and demos)
//!
//! Sources hand out freshly owned `Frame`s stamped with their capture time.
//! They never keep a frame after handing it to the pipeline.

pub mod file;
pub mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

pub use file::ImageFileSource;
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::{V4l2Config, V4l2Source};

use crate::config::CaptureSettings;
use crate::error::{Error, Result};
use crate::frame::Frame;

/// Counters reported by every source.
#[derive(Clone, Debug, Default)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub location: String,
}

/// A stream of frames.
pub trait FrameSource {
    /// Open the underlying device or file set.
    fn connect(&mut self) -> Result<()>;

    /// Next frame, or `None` once a finite source is exhausted.
    ///
    /// Errors here are frame-local: the caller may try again.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn connect(&mut self) -> Result<()> {
        (**self).connect()
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }

    fn is_healthy(&self) -> bool {
        (**self).is_healthy()
    }

    fn stats(&self) -> SourceStats {
        (**self).stats()
    }
}

/// Pick a source for `settings.source`.
///
/// `stub://...` is synthetic, `/dev/video*` is a V4L2 camera, anything else
/// is a local image file or directory. Remote URLs are rejected.
pub fn open_source(settings: &CaptureSettings) -> Result<Box<dyn FrameSource>> {
    let location = settings.source.trim();
    if location.is_empty() {
        return Err(Error::config("capture source must not be empty"));
    }
    if location.starts_with("stub://") {
        return Ok(Box::new(SyntheticSource::new(
            location,
            settings.width,
            settings.height,
        )));
    }
    if location.contains("://") {
        return Err(Error::config(format!(
            "capture source {} is not local (no URL schemes)",
            location
        )));
    }
    if location.starts_with("/dev/video") {
        #[cfg(feature = "ingest-v4l2")]
        {
            return Ok(Box::new(V4l2Source::new(V4l2Config {
                device: location.to_string(),
                width: settings.width,
                height: settings.height,
                target_fps: 10,
            })));
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            return Err(Error::config(format!(
                "camera {} requires the ingest-v4l2 feature",
                location
            )));
        }
    }
    Ok(Box::new(ImageFileSource::new(location)))
}
