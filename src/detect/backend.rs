use anyhow::Result;

use crate::detect::result::BoundingBox;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend wraps one loaded model. It returns every box the model produced,
/// in model output order, with the class name in `label` and coordinates in
/// frame pixels. Confidence filtering and class selection happen in
/// [`Detector`](crate::detect::Detector), not here.
///
/// Implementations must treat the frame as read-only.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run inference on a frame.
    fn infer(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>>;

    /// Optional warm-up hook, called once when the model context is built.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>> {
        (**self).infer(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
