use std::sync::atomic::AtomicBool;

use portal_watch::{
    BoundingBox, Detector, Error, Frame, FrameSource, ImageFileSource, MemorySink, ModelContext,
    ObjectClass, Pipeline, Publisher, RunOptions, SourceStats, StubBackend, StubResponse,
    SyntheticSource, Tolerance,
};

fn door() -> BoundingBox {
    BoundingBox::new(100.0, 100.0, 200.0, 200.0)
        .with_confidence(0.9)
        .with_label("door")
}

fn second_door() -> BoundingBox {
    BoundingBox::new(400.0, 100.0, 500.0, 300.0)
        .with_confidence(0.7)
        .with_label("door")
}

fn person_at_door() -> BoundingBox {
    // Top-left corner sits inside the door grown by 5px.
    BoundingBox::new(96.0, 140.0, 150.0, 280.0)
        .with_confidence(0.8)
        .with_label("person")
}

fn pipeline(door: StubBackend, window: StubBackend, people: StubBackend) -> Pipeline {
    let models = ModelContext::new(
        Detector::new(ObjectClass::Door, door, 0.45).expect("door detector"),
        Detector::new(ObjectClass::Window, window, 0.75).expect("window detector"),
        Detector::new(ObjectClass::Person, people, 0.25)
            .expect("people detector")
            .with_labels(["person"]),
    )
    .expect("model context");
    Pipeline::new(models, Tolerance::new(5.0).expect("tolerance"))
}

#[test]
fn person_near_first_door_produces_expected_event() {
    let mut pipeline = pipeline(
        StubBackend::fixed(vec![door()]),
        StubBackend::empty(),
        StubBackend::fixed(vec![person_at_door()]),
    );
    let frame = Frame::filled(640, 480, [40, 40, 40]);
    let event = pipeline.process_frame(&frame).expect("event");

    let record = event.record();
    assert!(record.near_door);
    assert!(!record.near_window);
    assert_eq!(record.door_detected, 1);
    assert_eq!(record.window_detected, 0);
    assert_eq!(record.people_detected, 1);
}

#[test]
fn only_first_door_is_a_proximity_reference() {
    let far_person = BoundingBox::new(420.0, 150.0, 460.0, 250.0)
        .with_confidence(0.9)
        .with_label("person");
    let mut pipeline = pipeline(
        StubBackend::fixed(vec![door(), second_door()]),
        StubBackend::empty(),
        StubBackend::fixed(vec![far_person]),
    );
    let event = pipeline
        .process_frame(&Frame::filled(640, 480, [0, 0, 0]))
        .expect("event");
    assert_eq!(event.door_count, 2);
    assert!(!event.near_door);
}

#[test]
fn low_confidence_and_foreign_labels_are_dropped() {
    let weak_window = BoundingBox::new(300.0, 50.0, 400.0, 120.0)
        .with_confidence(0.5)
        .with_label("window");
    let dog = BoundingBox::new(96.0, 140.0, 150.0, 280.0)
        .with_confidence(0.95)
        .with_label("dog");
    let mut pipeline = pipeline(
        StubBackend::fixed(vec![door()]),
        StubBackend::fixed(vec![weak_window]),
        StubBackend::fixed(vec![dog, person_at_door()]),
    );
    let event = pipeline
        .process_frame(&Frame::filled(640, 480, [0, 0, 0]))
        .expect("event");
    assert_eq!(event.window_count, 0);
    assert_eq!(event.people_count, 1);
    assert!(event.near_door);
}

#[test]
fn inference_error_skips_frame_and_loop_continues() {
    let mut pipeline = pipeline(
        StubBackend::fixed(vec![door()]),
        StubBackend::scripted(vec![
            StubResponse::Boxes(Vec::new()),
            StubResponse::Fail("malformed input".to_string()),
            StubResponse::Boxes(Vec::new()),
        ]),
        StubBackend::fixed(vec![person_at_door()]),
    );
    let mut source = SyntheticSource::new("stub://e2e", 640, 480);
    let mut publisher = Publisher::new("Device 1", "events", MemorySink::new());
    let stop = AtomicBool::new(false);
    let opts = RunOptions {
        max_frames: Some(3),
        ..RunOptions::default()
    };

    let stats = pipeline
        .run(&mut source, &mut publisher, &stop, &opts)
        .expect("run");
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.emitted, 2);

    let published = &publisher.sink().published;
    assert_eq!(published.len(), 2);
    for event in published {
        assert_eq!(event.device, "Device 1");
        assert_eq!(event.collection, "events");
        assert!(event.record.near_door);
        assert!(event.record.time.is_some());
    }
}

/// Hands out a fixed list of results, then reports exhaustion.
struct ScriptedSource {
    frames: Vec<portal_watch::Result<Frame>>,
}

impl FrameSource for ScriptedSource {
    fn connect(&mut self) -> portal_watch::Result<()> {
        self.frames.reverse();
        Ok(())
    }

    fn next_frame(&mut self) -> portal_watch::Result<Option<Frame>> {
        self.frames.pop().transpose()
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: 0,
            location: "scripted".to_string(),
        }
    }
}

#[test]
fn unreadable_frames_are_skipped_until_source_is_exhausted() {
    let mut pipeline = pipeline(
        StubBackend::empty(),
        StubBackend::empty(),
        StubBackend::empty(),
    );
    let mut source = ScriptedSource {
        frames: vec![
            Ok(Frame::filled(32, 32, [0, 0, 0])),
            Err(Error::Capture(anyhow::anyhow!("device busy"))),
            Ok(Frame::filled(32, 32, [0, 0, 0])),
        ],
    };
    source.connect().expect("connect");
    let mut publisher = Publisher::new("Device 1", "events", MemorySink::new());
    let stop = AtomicBool::new(false);

    let stats = pipeline
        .run(&mut source, &mut publisher, &stop, &RunOptions::default())
        .expect("run");
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.skipped, 1);
    assert!(publisher
        .sink()
        .published
        .iter()
        .all(|p| !p.record.near_door && !p.record.near_window));
}

#[test]
fn undecodable_image_is_skipped_and_next_image_processed() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(dir.path().join("a_broken.jpg"), b"not a jpeg").expect("write broken");
    Frame::filled(64, 48, [90, 90, 90])
        .save_jpeg(dir.path().join("b_good.jpg"))
        .expect("write good");

    let mut pipeline = pipeline(
        StubBackend::fixed(vec![door()]),
        StubBackend::empty(),
        StubBackend::empty(),
    );
    let mut source = ImageFileSource::new(dir.path());
    source.connect().expect("connect");
    let mut publisher = Publisher::new("Device 1", "events", MemorySink::new());
    let stop = AtomicBool::new(false);

    let stats = pipeline
        .run(&mut source, &mut publisher, &stop, &RunOptions::default())
        .expect("run");
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.processed, 1);
    assert_eq!(stats.emitted, 1);
    assert_eq!(publisher.sink().published[0].record.door_detected, 1);
}

#[test]
fn config_errors_end_the_run() {
    let mut pipeline = pipeline(
        StubBackend::empty(),
        StubBackend::empty(),
        StubBackend::empty(),
    );
    let mut source = ScriptedSource {
        frames: vec![Err(Error::config("bad source"))],
    };
    let mut publisher = Publisher::new("Device 1", "events", MemorySink::new());
    let stop = AtomicBool::new(false);
    let err = pipeline
        .run(&mut source, &mut publisher, &stop, &RunOptions::default())
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
