use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::BoundingBox;
use crate::frame::Frame;

/// Stub backend for tests and synthetic runs. Never loads a model.
///
/// Responses are either a fixed script replayed in a loop, or a demo layout
/// placed relative to the frame size.
pub struct StubBackend {
    mode: StubMode,
    calls: u64,
}

enum StubMode {
    Script(Vec<StubResponse>),
    Demo(DemoLayout),
}

/// One scripted backend response.
#[derive(Clone, Debug)]
pub enum StubResponse {
    Boxes(Vec<BoundingBox>),
    Fail(String),
}

#[derive(Clone, Copy, Debug)]
enum DemoLayout {
    Door,
    Window,
    Person,
}

impl StubBackend {
    /// Returns no boxes on every call.
    pub fn empty() -> Self {
        Self::scripted(vec![StubResponse::Boxes(Vec::new())])
    }

    /// Returns the same boxes on every call.
    pub fn fixed(boxes: Vec<BoundingBox>) -> Self {
        Self::scripted(vec![StubResponse::Boxes(boxes)])
    }

    /// Fails on every call with `reason`.
    pub fn failing(reason: &str) -> Self {
        Self::scripted(vec![StubResponse::Fail(reason.to_string())])
    }

    /// Replays `script` in order, wrapping around when it runs out.
    pub fn scripted(script: Vec<StubResponse>) -> Self {
        Self {
            mode: StubMode::Script(script),
            calls: 0,
        }
    }

    /// Build from a `stub://<layout>` model path.
    ///
    /// `stub://door`, `stub://window` and `stub://person` produce one demo box
    /// placed so that the person touches the door but not the window.
    /// `stub://none` produces nothing.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let layout = uri
            .strip_prefix("stub://")
            .ok_or_else(|| anyhow!("not a stub model path: {}", uri))?;
        let mode = match layout.trim().to_lowercase().as_str() {
            "door" => StubMode::Demo(DemoLayout::Door),
            "window" => StubMode::Demo(DemoLayout::Window),
            "person" | "people" => StubMode::Demo(DemoLayout::Person),
            "" | "none" => StubMode::Script(vec![StubResponse::Boxes(Vec::new())]),
            other => return Err(anyhow!("unknown stub layout '{}'", other)),
        };
        Ok(Self { mode, calls: 0 })
    }

    /// Number of `infer` calls seen so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::empty()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>> {
        let call = self.calls;
        self.calls += 1;

        match &self.mode {
            StubMode::Script(script) => {
                if script.is_empty() {
                    return Ok(Vec::new());
                }
                match &script[(call % script.len() as u64) as usize] {
                    StubResponse::Boxes(boxes) => Ok(boxes.clone()),
                    StubResponse::Fail(reason) => {
                        Err(anyhow!("stub inference failure: {}", reason))
                    }
                }
            }
            StubMode::Demo(layout) => Ok(vec![demo_box(*layout, frame.width(), frame.height())]),
        }
    }
}

fn demo_box(layout: DemoLayout, width: u32, height: u32) -> BoundingBox {
    let w = width as f32;
    let h = height as f32;
    let (fx0, fy0, fx1, fy1, confidence, label) = match layout {
        DemoLayout::Door => (0.10, 0.15, 0.35, 0.95, 0.88, "door"),
        DemoLayout::Window => (0.60, 0.20, 0.90, 0.55, 0.82, "window"),
        DemoLayout::Person => (0.33, 0.30, 0.50, 0.95, 0.91, "person"),
    };
    BoundingBox::new(fx0 * w, fy0 * h, fx1 * w, fy1 * h)
        .with_confidence(confidence)
        .with_label(label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_backend_replays_in_order() {
        let frame = Frame::filled(10, 10, [0, 0, 0]);
        let mut backend = StubBackend::scripted(vec![
            StubResponse::Boxes(vec![BoundingBox::new(0.0, 0.0, 1.0, 1.0)]),
            StubResponse::Fail("boom".to_string()),
        ]);

        assert_eq!(backend.infer(&frame).unwrap().len(), 1);
        assert!(backend.infer(&frame).is_err());
        assert_eq!(backend.infer(&frame).unwrap().len(), 1);
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn demo_layout_scales_with_frame() -> Result<()> {
        let frame = Frame::filled(200, 100, [0, 0, 0]);
        let mut backend = StubBackend::from_uri("stub://door")?;
        let boxes = backend.infer(&frame)?;
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].label, "door");
        assert!((boxes[0].x_max - 70.0).abs() < 1e-3);
        assert!((boxes[0].y_max - 95.0).abs() < 1e-3);
        Ok(())
    }

    #[test]
    fn unknown_stub_layout_is_rejected() {
        assert!(StubBackend::from_uri("stub://giraffe").is_err());
        assert!(StubBackend::from_uri("models/door.onnx").is_err());
        assert!(StubBackend::from_uri("stub://none").is_ok());
    }
}
