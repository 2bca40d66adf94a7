//! Error types for portal-watch.
//!
//! Geometry and aggregation are total and never produce these. Only detection,
//! frame I/O, configuration and persistence can fail.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A model failed to process a frame. Abandons that frame only.
    #[error("inference failed in {detector} detector: {source:#}")]
    Inference {
        detector: String,
        #[source]
        source: anyhow::Error,
    },

    /// An image path could not be read or decoded.
    #[error("failed to read frame from {}: {source}", path.display())]
    FrameRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A capture source failed to deliver a frame.
    #[error("frame capture failed: {0:#}")]
    Capture(anyhow::Error),

    /// Invalid threshold, tolerance or other setup value. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// A persistence collaborator rejected an image or event.
    #[error("persistence failed: {0:#}")]
    Persist(anyhow::Error),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// True when the failure only abandons the current frame and the
    /// continuous loop should move on to the next one.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            Error::Inference { .. } | Error::FrameRead { .. } | Error::Capture(_)
        )
    }
}
