use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, DetectionSet, ObjectClass};
use crate::error::{Error, Result};
use crate::frame::Frame;

/// One loaded model bound to one object class and one confidence threshold.
pub struct Detector {
    class: ObjectClass,
    backend: Box<dyn DetectorBackend>,
    threshold: f32,
    labels: Vec<String>,
}

impl Detector {
    pub fn new<B: DetectorBackend + 'static>(
        class: ObjectClass,
        backend: B,
        threshold: f32,
    ) -> Result<Self> {
        let threshold = validate_threshold(threshold, class.as_str())?;
        Ok(Self {
            class,
            backend: Box::new(backend),
            threshold,
            labels: Vec::new(),
        })
    }

    /// Keep only boxes whose label is in `labels` (case-insensitive).
    /// An empty list accepts every label.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels
            .into_iter()
            .map(|l| l.into().trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        self
    }

    pub fn class(&self) -> ObjectClass {
        self.class
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn warm_up(&mut self) -> Result<()> {
        self.backend.warm_up().map_err(|source| Error::Inference {
            detector: self.class.as_str().to_string(),
            source,
        })
    }

    /// Run the model on `frame` and keep boxes with `confidence >= threshold`.
    ///
    /// The frame is not modified. Backend failures become [`Error::Inference`].
    pub fn detect(&mut self, frame: &Frame) -> Result<DetectionSet> {
        let raw = self.backend.infer(frame).map_err(|source| Error::Inference {
            detector: self.class.as_str().to_string(),
            source,
        })?;
        let total = raw.len();

        let boxes: Vec<BoundingBox> = raw
            .into_iter()
            .filter(|b| b.is_finite() && b.confidence >= self.threshold)
            .filter(|b| self.accepts_label(&b.label))
            .map(|b| {
                let confidence = b.confidence.min(1.0);
                let b = b.normalized().with_confidence(confidence);
                if b.label.is_empty() {
                    b.with_label(self.class.as_str())
                } else {
                    b
                }
            })
            .collect();

        log::debug!(
            "{} detector ({}): kept {} of {} boxes at threshold {:.2}",
            self.class,
            self.backend.name(),
            boxes.len(),
            total,
            self.threshold
        );
        Ok(DetectionSet::new(self.class, boxes))
    }

    fn accepts_label(&self, label: &str) -> bool {
        if self.labels.is_empty() {
            return true;
        }
        let label = label.trim().to_lowercase();
        self.labels.iter().any(|allowed| *allowed == label)
    }
}

impl std::fmt::Debug for Detector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Detector")
            .field("class", &self.class)
            .field("backend", &self.backend.name())
            .field("threshold", &self.threshold)
            .field("labels", &self.labels)
            .finish()
    }
}

/// Confidence thresholds must be finite and within `[0, 1]`.
pub fn validate_threshold(value: f32, what: &str) -> Result<f32> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(Error::config(format!(
            "{} confidence threshold must be within [0, 1], got {}",
            what, value
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::StubBackend;

    fn boxes() -> Vec<BoundingBox> {
        vec![
            BoundingBox::new(0.0, 0.0, 10.0, 10.0)
                .with_confidence(0.9)
                .with_label("door"),
            BoundingBox::new(5.0, 5.0, 20.0, 20.0)
                .with_confidence(0.3)
                .with_label("door"),
            BoundingBox::new(30.0, 30.0, 40.0, 40.0)
                .with_confidence(0.5)
                .with_label("door"),
        ]
    }

    #[test]
    fn detect_drops_boxes_below_threshold() -> anyhow::Result<()> {
        let mut detector = Detector::new(ObjectClass::Door, StubBackend::fixed(boxes()), 0.5)?;
        let set = detector.detect(&Frame::filled(64, 64, [0, 0, 0]))?;
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(|b| b.confidence >= 0.5));
        assert_eq!(set.class(), ObjectClass::Door);
        Ok(())
    }

    #[test]
    fn label_allowlist_filters_other_classes() -> anyhow::Result<()> {
        let backend = StubBackend::fixed(vec![
            BoundingBox::new(0.0, 0.0, 1.0, 1.0)
                .with_confidence(0.8)
                .with_label("person"),
            BoundingBox::new(0.0, 0.0, 1.0, 1.0)
                .with_confidence(0.8)
                .with_label("dog"),
        ]);
        let mut detector =
            Detector::new(ObjectClass::Person, backend, 0.25)?.with_labels(["Person"]);
        let set = detector.detect(&Frame::filled(8, 8, [0, 0, 0]))?;
        assert_eq!(set.len(), 1);
        assert_eq!(set.boxes()[0].label, "person");
        Ok(())
    }

    #[test]
    fn unlabeled_and_reversed_boxes_are_repaired() -> anyhow::Result<()> {
        let backend = StubBackend::fixed(vec![
            BoundingBox::new(10.0, 10.0, 2.0, 2.0).with_confidence(0.9),
            BoundingBox::new(f32::NAN, 0.0, 1.0, 1.0).with_confidence(0.9),
        ]);
        let mut detector = Detector::new(ObjectClass::Window, backend, 0.1)?;
        let set = detector.detect(&Frame::filled(16, 16, [0, 0, 0]))?;
        assert_eq!(set.len(), 1);
        let b = &set.boxes()[0];
        assert_eq!((b.x_min, b.x_max), (2.0, 10.0));
        assert_eq!(b.label, "window");
        Ok(())
    }

    #[test]
    fn overconfident_boxes_are_clamped_to_one() -> anyhow::Result<()> {
        let backend = StubBackend::fixed(vec![BoundingBox::new(0.0, 0.0, 4.0, 4.0)
            .with_confidence(3.5)
            .with_label("door")]);
        let mut detector = Detector::new(ObjectClass::Door, backend, 1.0)?;
        let set = detector.detect(&Frame::filled(8, 8, [0, 0, 0]))?;
        assert_eq!(set.len(), 1);
        assert_eq!(set.boxes()[0].confidence, 1.0);
        Ok(())
    }

    #[test]
    fn backend_failure_is_inference_error() -> anyhow::Result<()> {
        let mut detector = Detector::new(ObjectClass::Door, StubBackend::failing("corrupt"), 0.5)?;
        let err = detector.detect(&Frame::filled(4, 4, [0, 0, 0])).unwrap_err();
        match err {
            Error::Inference { detector, .. } => assert_eq!(detector, "door"),
            other => panic!("expected inference error, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn invalid_thresholds_are_config_errors() {
        for bad in [-0.1, 1.5, f32::NAN] {
            let err = Detector::new(ObjectClass::Door, StubBackend::empty(), bad).unwrap_err();
            assert!(matches!(err, Error::Config(_)));
        }
    }
}
