//! Persistence collaborators: annotated image storage and event publishing.
//!
//! These sit outside the detection core. Failures are reported as
//! [`Error::Persist`] and the driver loop logs them and keeps going.

use anyhow::{anyhow, Context};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::event::{EventRecord, FrameEvent};
use crate::frame::Frame;

/// Publishes event records to an event database keyed by device and collection.
pub trait EventSink {
    fn publish(&mut self, device: &str, collection: &str, record: &EventRecord) -> Result<()>;
}

impl<E: EventSink + ?Sized> EventSink for Box<E> {
    fn publish(&mut self, device: &str, collection: &str, record: &EventRecord) -> Result<()> {
        (**self).publish(device, collection, record)
    }
}

/// Stores an annotated frame and returns where it can be found.
pub trait ImageStore {
    fn store(&mut self, seq: u64, frame: &Frame) -> Result<String>;
}

#[derive(Serialize)]
struct Envelope<'a> {
    device: &'a str,
    collection: &'a str,
    data: &'a EventRecord,
}

/// Appends one JSON object per event to a local file.
pub struct JsonLinesSink {
    path: PathBuf,
    file: File,
}

impl JsonLinesSink {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open event log {}", path.display()))
            .map_err(Error::Persist)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSink for JsonLinesSink {
    fn publish(&mut self, device: &str, collection: &str, record: &EventRecord) -> Result<()> {
        let line = serde_json::to_string(&Envelope {
            device,
            collection,
            data: record,
        })
        .map_err(|e| Error::Persist(e.into()))?;
        writeln!(self.file, "{}", line)
            .with_context(|| format!("failed to append to {}", self.path.display()))
            .map_err(Error::Persist)
    }
}

/// Event published to a [`MemorySink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedEvent {
    pub device: String,
    pub collection: String,
    pub record: EventRecord,
}

/// Keeps published events in memory. Can be told to fail for tests.
#[derive(Default)]
pub struct MemorySink {
    pub published: Vec<PublishedEvent>,
    fail: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            published: Vec::new(),
            fail: true,
        }
    }
}

impl EventSink for MemorySink {
    fn publish(&mut self, device: &str, collection: &str, record: &EventRecord) -> Result<()> {
        if self.fail {
            return Err(Error::Persist(anyhow!("memory sink configured to fail")));
        }
        self.published.push(PublishedEvent {
            device: device.to_string(),
            collection: collection.to_string(),
            record: record.clone(),
        });
        Ok(())
    }
}

/// Writes annotated frames as `dir/img{seq % ring}.jpg`.
pub struct DirImageStore {
    dir: PathBuf,
    ring: u32,
}

impl DirImageStore {
    pub fn new<P: AsRef<Path>>(dir: P, ring: u32) -> Result<Self> {
        if ring == 0 {
            return Err(Error::config("image ring must be > 0"));
        }
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))
            .map_err(Error::Persist)?;
        Ok(Self { dir, ring })
    }

    pub fn path_for(&self, seq: u64) -> PathBuf {
        self.dir.join(format!("img{}.jpg", seq % self.ring as u64))
    }
}

impl ImageStore for DirImageStore {
    fn store(&mut self, seq: u64, frame: &Frame) -> Result<String> {
        let path = self.path_for(seq);
        frame.save_jpeg(&path).map_err(Error::Persist)?;
        Ok(path.display().to_string())
    }
}

/// Routes each event to the image store and event sink.
///
/// `Time` is filled with the capture time in UNIX seconds and `img_url` with
/// the stored image location. An image failure still publishes the event,
/// without `img_url`.
pub struct Publisher<E: EventSink = Box<dyn EventSink>> {
    device_id: String,
    collection: String,
    images: Option<Box<dyn ImageStore>>,
    events: E,
}

impl<E: EventSink> Publisher<E> {
    pub fn new(device_id: &str, collection: &str, events: E) -> Self {
        Self {
            device_id: device_id.to_string(),
            collection: collection.to_string(),
            images: None,
            events,
        }
    }

    pub fn with_images(mut self, images: Box<dyn ImageStore>) -> Self {
        self.images = Some(images);
        self
    }

    pub fn sink(&self) -> &E {
        &self.events
    }

    pub fn publish(&mut self, seq: u64, event: &FrameEvent) -> Result<EventRecord> {
        let mut record = event.record();
        record.time = Some(event.epoch_s().to_string());

        if let Some(images) = self.images.as_mut() {
            match images.store(seq, &event.annotated_frame) {
                Ok(url) => record.img_url = Some(url),
                Err(err) => log::warn!("annotated image for frame {} not stored: {}", seq, err),
            }
        }

        self.events
            .publish(&self.device_id, &self.collection, &record)?;
        log::debug!(
            "published frame {} to {}/{}",
            seq,
            self.device_id,
            self.collection
        );
        Ok(record)
    }
}
