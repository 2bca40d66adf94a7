use crate::config::{ModelSettings, WatchConfig};
use crate::detect::backend::DetectorBackend;
use crate::detect::backends::StubBackend;
use crate::detect::detector::Detector;
use crate::detect::result::{DetectionSet, ObjectClass};
use crate::error::{Error, Result};
use crate::frame::Frame;

/// The three detection sets of one frame.
#[derive(Clone, Debug)]
pub struct FrameDetections {
    pub doors: DetectionSet,
    pub windows: DetectionSet,
    pub people: DetectionSet,
}

/// Loaded detectors, one per object class.
///
/// Built once at startup and handed to the pipeline. Models are never
/// reloaded while the context is alive.
#[derive(Debug)]
pub struct ModelContext {
    door: Detector,
    window: Detector,
    people: Detector,
}

impl ModelContext {
    pub fn new(door: Detector, window: Detector, people: Detector) -> Result<Self> {
        for (detector, expected) in [
            (&door, ObjectClass::Door),
            (&window, ObjectClass::Window),
            (&people, ObjectClass::Person),
        ] {
            if detector.class() != expected {
                return Err(Error::config(format!(
                    "{} slot was given a {} detector",
                    expected,
                    detector.class()
                )));
            }
        }
        Ok(Self {
            door,
            window,
            people,
        })
    }

    /// Load every model named in the configuration and warm it up.
    pub fn from_config(cfg: &WatchConfig) -> Result<Self> {
        let mut ctx = Self::new(
            build_detector(ObjectClass::Door, &cfg.models.door)?,
            build_detector(ObjectClass::Window, &cfg.models.window)?,
            build_detector(ObjectClass::Person, &cfg.models.people)?,
        )?;
        for detector in ctx.detectors_mut() {
            detector.warm_up()?;
            log::info!(
                "model context: {} detector backend={} threshold={:.2} labels={:?}",
                detector.class(),
                detector.backend_name(),
                detector.threshold(),
                detector.labels()
            );
        }
        Ok(ctx)
    }

    pub fn detector(&self, class: ObjectClass) -> &Detector {
        match class {
            ObjectClass::Door => &self.door,
            ObjectClass::Window => &self.window,
            ObjectClass::Person => &self.people,
        }
    }

    fn detectors_mut(&mut self) -> [&mut Detector; 3] {
        [&mut self.door, &mut self.window, &mut self.people]
    }

    /// Run doors, then windows, then people. The first failure aborts the frame.
    pub fn detect_all(&mut self, frame: &Frame) -> Result<FrameDetections> {
        let doors = self.door.detect(frame)?;
        let windows = self.window.detect(frame)?;
        let people = self.people.detect(frame)?;
        Ok(FrameDetections {
            doors,
            windows,
            people,
        })
    }
}

fn build_detector(class: ObjectClass, settings: &ModelSettings) -> Result<Detector> {
    let backend = build_backend(class, settings)?;
    Ok(Detector::new(class, backend, settings.threshold)?.with_labels(settings.labels.clone()))
}

fn build_backend(class: ObjectClass, settings: &ModelSettings) -> Result<Box<dyn DetectorBackend>> {
    if settings.path.starts_with("stub://") {
        let backend = StubBackend::from_uri(&settings.path)
            .map_err(|e| Error::config(format!("{} model: {:#}", class, e)))?;
        return Ok(Box::new(backend));
    }

    #[cfg(feature = "backend-tract")]
    {
        use crate::detect::backends::TractBackend;

        let backend = TractBackend::new(&settings.path, settings.input_size)
            .map_err(|e| Error::config(format!("{} model: {:#}", class, e)))?
            .with_names(settings.names.clone())
            .with_iou_threshold(settings.iou_threshold);
        Ok(Box::new(backend))
    }
    #[cfg(not(feature = "backend-tract"))]
    {
        Err(Error::config(format!(
            "{} model {} requires the backend-tract feature",
            class, settings.path
        )))
    }
}
