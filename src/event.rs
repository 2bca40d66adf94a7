//! Per-frame event produced by the pipeline.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::aggregate::Aggregate;
use crate::frame::Frame;

/// Aggregated findings for one frame plus the annotated buffer.
#[derive(Clone, Debug)]
pub struct FrameEvent {
    pub timestamp: SystemTime,
    pub people_count: usize,
    pub door_count: usize,
    pub window_count: usize,
    pub near_door: bool,
    pub near_window: bool,
    pub annotated_frame: Frame,
}

impl FrameEvent {
    pub fn new(timestamp: SystemTime, aggregate: &Aggregate, annotated_frame: Frame) -> Self {
        Self {
            timestamp,
            people_count: aggregate.counts.people,
            door_count: aggregate.counts.doors,
            window_count: aggregate.counts.windows,
            near_door: aggregate.near_door,
            near_window: aggregate.near_window,
            annotated_frame,
        }
    }

    /// Capture time in whole UNIX seconds; 0 for clocks before the epoch.
    pub fn epoch_s(&self) -> u64 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    /// Database record with `Time` and `img_url` left for the persistence side.
    pub fn record(&self) -> EventRecord {
        EventRecord {
            time: None,
            img_url: None,
            near_door: self.near_door,
            near_window: self.near_window,
            people_detected: self.people_count,
            door_detected: self.door_count,
            window_detected: self.window_count,
        }
    }
}

/// Event as stored by the event database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "Time")]
    pub time: Option<String>,
    pub img_url: Option<String>,
    pub near_door: bool,
    pub near_window: bool,
    pub people_detected: usize,
    pub door_detected: usize,
    pub window_detected: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::DetectionCounts;

    #[test]
    fn record_serializes_with_database_field_names() -> anyhow::Result<()> {
        let aggregate = Aggregate {
            near_door: true,
            near_window: false,
            counts: DetectionCounts {
                people: 2,
                doors: 1,
                windows: 0,
            },
            ..Aggregate::default()
        };
        let frame = Frame::filled(2, 2, [0, 0, 0]);
        let event = FrameEvent::new(SystemTime::UNIX_EPOCH, &aggregate, frame);
        let mut record = event.record();
        record.time = Some("1700000000".to_string());

        let value = serde_json::to_value(&record)?;
        let obj = value.as_object().expect("record is an object");
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "Time",
                "door_detected",
                "img_url",
                "near_door",
                "near_window",
                "people_detected",
                "window_detected"
            ]
        );
        assert_eq!(obj["Time"], "1700000000");
        assert!(obj["img_url"].is_null());
        assert_eq!(obj["people_detected"], 2);
        assert_eq!(obj["near_door"], true);
        Ok(())
    }
}
