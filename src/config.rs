use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::detect::validate_threshold;
use crate::error::{Error, Result};
use crate::proximity::{Tolerance, DEFAULT_EPSILON};

const DEFAULT_DEVICE_ID: &str = "Device 1";
const DEFAULT_COLLECTION: &str = "events";
const DEFAULT_DOOR_MODEL: &str = "stub://door";
const DEFAULT_WINDOW_MODEL: &str = "stub://window";
const DEFAULT_PEOPLE_MODEL: &str = "stub://person";
const DEFAULT_DOOR_THRESHOLD: f32 = 0.45;
const DEFAULT_WINDOW_THRESHOLD: f32 = 0.75;
const DEFAULT_PEOPLE_THRESHOLD: f32 = 0.25;
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_CAPTURE_SOURCE: &str = "stub://camera";
const DEFAULT_CAPTURE_WIDTH: u32 = 1280;
const DEFAULT_CAPTURE_HEIGHT: u32 = 720;
const DEFAULT_INTERVAL_MS: u64 = 2000;
const DEFAULT_OUTPUT_DIR: &str = "results";
const DEFAULT_EVENTS_PATH: &str = "events.jsonl";
const DEFAULT_IMAGE_RING: u32 = 10;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct WatchConfigFile {
    device_id: Option<String>,
    collection: Option<String>,
    models: Option<ModelsConfigFile>,
    proximity: Option<ProximityConfigFile>,
    capture: Option<CaptureConfigFile>,
    output: Option<OutputConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelsConfigFile {
    door: Option<ModelConfigFile>,
    window: Option<ModelConfigFile>,
    people: Option<ModelConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ModelConfigFile {
    path: Option<String>,
    threshold: Option<f32>,
    labels: Option<Vec<String>>,
    names: Option<Vec<String>>,
    input_size: Option<u32>,
    iou_threshold: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ProximityConfigFile {
    epsilon: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CaptureConfigFile {
    source: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct OutputConfigFile {
    dir: Option<PathBuf>,
    events_path: Option<PathBuf>,
    ring: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub device_id: String,
    pub collection: String,
    pub models: ModelsSettings,
    pub epsilon: f32,
    pub capture: CaptureSettings,
    pub output: OutputSettings,
}

#[derive(Debug, Clone)]
pub struct ModelsSettings {
    pub door: ModelSettings,
    pub window: ModelSettings,
    pub people: ModelSettings,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// `stub://<layout>` or a path to an ONNX model.
    pub path: String,
    pub threshold: f32,
    /// Accepted labels; empty accepts all.
    pub labels: Vec<String>,
    /// Class names by class id, for ONNX models.
    pub names: Vec<String>,
    pub input_size: u32,
    pub iou_threshold: f32,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub source: String,
    pub width: u32,
    pub height: u32,
    pub interval: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            source: DEFAULT_CAPTURE_SOURCE.to_string(),
            width: DEFAULT_CAPTURE_WIDTH,
            height: DEFAULT_CAPTURE_HEIGHT,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub events_path: PathBuf,
    /// Annotated images are stored as `img{n % ring}.jpg`.
    pub ring: u32,
}

impl WatchConfig {
    /// Defaults, then the TOML file named by `PORTAL_CONFIG`, then environment overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var("PORTAL_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        Self::load_from(path.as_deref())
    }

    /// Same as [`WatchConfig::load`] with an explicit config file.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => read_config_file(path)?,
            None => WatchConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document without consulting the environment.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: WatchConfigFile =
            toml::from_str(raw).map_err(|e| Error::config(format!("invalid config: {}", e)))?;
        let cfg = Self::from_file(file);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: WatchConfigFile) -> Self {
        let models = file.models.unwrap_or_default();
        let capture = file.capture.unwrap_or_default();
        let output = file.output.unwrap_or_default();

        Self {
            device_id: file
                .device_id
                .unwrap_or_else(|| DEFAULT_DEVICE_ID.to_string()),
            collection: file
                .collection
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            models: ModelsSettings {
                door: model_settings(models.door, DEFAULT_DOOR_MODEL, DEFAULT_DOOR_THRESHOLD, &[]),
                window: model_settings(
                    models.window,
                    DEFAULT_WINDOW_MODEL,
                    DEFAULT_WINDOW_THRESHOLD,
                    &[],
                ),
                people: model_settings(
                    models.people,
                    DEFAULT_PEOPLE_MODEL,
                    DEFAULT_PEOPLE_THRESHOLD,
                    &["person"],
                ),
            },
            epsilon: file
                .proximity
                .and_then(|p| p.epsilon)
                .unwrap_or(DEFAULT_EPSILON),
            capture: CaptureSettings {
                source: capture
                    .source
                    .unwrap_or_else(|| DEFAULT_CAPTURE_SOURCE.to_string()),
                width: capture.width.unwrap_or(DEFAULT_CAPTURE_WIDTH),
                height: capture.height.unwrap_or(DEFAULT_CAPTURE_HEIGHT),
                interval: Duration::from_millis(capture.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS)),
            },
            output: OutputSettings {
                dir: output
                    .dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
                events_path: output
                    .events_path
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_EVENTS_PATH)),
                ring: output.ring.unwrap_or(DEFAULT_IMAGE_RING),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device_id) = std::env::var("PORTAL_DEVICE_ID") {
            if !device_id.trim().is_empty() {
                self.device_id = device_id;
            }
        }
        if let Ok(source) = std::env::var("PORTAL_CAPTURE_SOURCE") {
            if !source.trim().is_empty() {
                self.capture.source = source;
            }
        }
        if let Ok(dir) = std::env::var("PORTAL_OUTPUT_DIR") {
            if !dir.trim().is_empty() {
                self.output.dir = PathBuf::from(dir);
            }
        }
        if let Some(epsilon) = env_f32("PORTAL_EPSILON")? {
            self.epsilon = epsilon;
        }
        if let Some(threshold) = env_f32("PORTAL_DOOR_THRESHOLD")? {
            self.models.door.threshold = threshold;
        }
        if let Some(threshold) = env_f32("PORTAL_WINDOW_THRESHOLD")? {
            self.models.window.threshold = threshold;
        }
        if let Some(threshold) = env_f32("PORTAL_PEOPLE_THRESHOLD")? {
            self.models.people.threshold = threshold;
        }
        Ok(())
    }

    /// Reject values that would make detection or proximity meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.device_id.trim().is_empty() {
            return Err(Error::config("device_id must not be empty"));
        }
        if self.collection.trim().is_empty() {
            return Err(Error::config("collection must not be empty"));
        }
        for (name, model) in [
            ("door", &self.models.door),
            ("window", &self.models.window),
            ("people", &self.models.people),
        ] {
            if model.path.trim().is_empty() {
                return Err(Error::config(format!("{} model path must not be empty", name)));
            }
            validate_threshold(model.threshold, name)?;
            if !model.iou_threshold.is_finite() || !(0.0..=1.0).contains(&model.iou_threshold) {
                return Err(Error::config(format!(
                    "{} iou_threshold must be within [0, 1], got {}",
                    name, model.iou_threshold
                )));
            }
            if model.input_size == 0 {
                return Err(Error::config(format!("{} input_size must be > 0", name)));
            }
        }
        Tolerance::new(self.epsilon)?;
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(Error::config("capture width and height must be > 0"));
        }
        if self.output.ring == 0 {
            return Err(Error::config("output ring must be > 0"));
        }
        Ok(())
    }

    pub fn tolerance(&self) -> Result<Tolerance> {
        Tolerance::new(self.epsilon)
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::from_file(WatchConfigFile::default())
    }
}

fn model_settings(
    file: Option<ModelConfigFile>,
    default_path: &str,
    default_threshold: f32,
    default_labels: &[&str],
) -> ModelSettings {
    let file = file.unwrap_or_default();
    ModelSettings {
        path: file.path.unwrap_or_else(|| default_path.to_string()),
        threshold: file.threshold.unwrap_or(default_threshold),
        labels: file
            .labels
            .unwrap_or_else(|| default_labels.iter().map(|l| l.to_string()).collect()),
        names: file.names.unwrap_or_default(),
        input_size: file.input_size.unwrap_or(DEFAULT_INPUT_SIZE),
        iou_threshold: file.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
    }
}

fn read_config_file(path: &Path) -> Result<WatchConfigFile> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("failed to read config file {}: {}", path.display(), e))
    })?;
    toml::from_str(&raw)
        .map_err(|e| Error::config(format!("invalid config file {}: {}", path.display(), e)))
}

fn env_f32(key: &str) -> Result<Option<f32>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<f32>()
            .map(Some)
            .map_err(|_| Error::config(format!("{} must be a number", key))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() -> Result<()> {
        let cfg = WatchConfig::default();
        cfg.validate()?;
        assert_eq!(cfg.device_id, "Device 1");
        assert_eq!(cfg.models.door.threshold, 0.45);
        assert_eq!(cfg.models.window.threshold, 0.75);
        assert_eq!(cfg.models.people.labels, vec!["person".to_string()]);
        assert_eq!(cfg.epsilon, 5.0);
        assert_eq!(cfg.capture.interval, Duration::from_secs(2));
        assert_eq!(cfg.output.ring, 10);
        Ok(())
    }

    #[test]
    fn toml_sections_override_defaults() -> Result<()> {
        let cfg = WatchConfig::from_toml_str(
            r#"
            device_id = "porch"

            [models.door]
            path = "stub://none"
            threshold = 0.6

            [proximity]
            epsilon = 12.5

            [capture]
            width = 640
            height = 480
            interval_ms = 250
            "#,
        )?;
        assert_eq!(cfg.device_id, "porch");
        assert_eq!(cfg.models.door.path, "stub://none");
        assert_eq!(cfg.models.door.threshold, 0.6);
        assert_eq!(cfg.models.window.path, "stub://window");
        assert_eq!(cfg.epsilon, 12.5);
        assert_eq!((cfg.capture.width, cfg.capture.height), (640, 480));
        assert_eq!(cfg.capture.interval, Duration::from_millis(250));
        Ok(())
    }

    #[test]
    fn out_of_range_values_are_config_errors() {
        for raw in [
            "[models.window]\nthreshold = 1.2",
            "[models.people]\nthreshold = -0.1",
            "[models.door]\niou_threshold = 2.0",
            "[proximity]\nepsilon = -1.0",
            "[capture]\nwidth = 0",
            "[output]\nring = 0",
            "device_id = \"  \"",
            "unknown_key = 1",
        ] {
            let err = WatchConfig::from_toml_str(raw).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{raw}: {err}");
        }
    }
}
