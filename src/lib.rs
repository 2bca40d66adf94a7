//! portal-watch
//!
//! Detects people, doors and windows in camera frames and decides whether a
//! person stands next to an opening.
//!
//! # Architecture
//!
//! Each frame flows strictly downward:
//!
//! 1. **Detect**: one detector per class (door, window, person) returns a
//!    [`DetectionSet`] of boxes at or above its confidence threshold.
//! 2. **Annotate**: boxes and labels are drawn onto a copy of the frame.
//! 3. **Proximity**: each person box is tested against the first door and
//!    the first window, grown by a pixel tolerance.
//! 4. **Aggregate**: counts and near-door / near-window flags become a
//!    [`FrameEvent`].
//!
//! The per-frame core in [`pipeline`] has no I/O of its own. Capture
//! ([`ingest`]) and persistence ([`sink`]) are collaborators driven by
//! [`Pipeline::run`].
//!
//! # Module Structure
//!
//! - `frame`: owned RGB frame buffers
//! - `detect`: detector backends, thresholds, model context
//! - `annotate`: box, label and notice drawing
//! - `proximity`, `aggregate`: geometric test and per-frame fusion
//! - `ingest`: frame sources (image files, V4L2 cameras, synthetic)
//! - `sink`: image store and event publishing
//! - `config`: TOML + environment configuration

pub mod aggregate;
pub mod annotate;
pub mod config;
pub mod detect;
pub mod error;
pub mod event;
pub mod frame;
pub mod ingest;
pub mod pipeline;
pub mod proximity;
pub mod sink;

pub use aggregate::{aggregate, Aggregate, DetectionCounts};
pub use annotate::{annotate, annotate_proximity, AnnotationStyles, BoxStyle};
pub use config::WatchConfig;
pub use detect::{
    BoundingBox, DetectionSet, Detector, DetectorBackend, FrameDetections, ModelContext,
    ObjectClass, StubBackend, StubResponse,
};
pub use error::{Error, Result};
pub use event::{EventRecord, FrameEvent};
pub use frame::Frame;
pub use ingest::{open_source, FrameSource, ImageFileSource, SourceStats, SyntheticSource};
pub use pipeline::{Pipeline, PipelineStats, RunOptions};
pub use proximity::{evaluate, is_near, ProximityResult, Tolerance, DEFAULT_EPSILON};
pub use sink::{DirImageStore, EventSink, ImageStore, JsonLinesSink, MemorySink, Publisher};
