//! Detector layer: model backends, per-class detectors and the model context.

mod backend;
pub mod backends;
mod detector;
mod nms;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::{StubBackend, StubResponse};
pub use detector::{validate_threshold, Detector};
pub use nms::non_max_suppression;
pub use registry::{FrameDetections, ModelContext};
pub use result::{BoundingBox, DetectionSet, ObjectClass};
