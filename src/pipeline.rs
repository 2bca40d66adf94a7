//! Per-frame orchestration and the continuous driver loop.
//!
//! [`Pipeline::process_frame`] is the side-effect-free core:
//! detect doors, windows and people, annotate all three sets, fuse them, and
//! return a [`FrameEvent`]. [`Pipeline::run`] wraps it with acquisition,
//! persistence, pacing and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::aggregate::aggregate;
use crate::annotate::{annotate, annotate_proximity, AnnotationStyles};
use crate::config::WatchConfig;
use crate::detect::ModelContext;
use crate::error::Result;
use crate::event::FrameEvent;
use crate::frame::Frame;
use crate::ingest::FrameSource;
use crate::proximity::Tolerance;
use crate::sink::{EventSink, Publisher};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);
const STOP_POLL: Duration = Duration::from_millis(100);

/// Pacing and limits for [`Pipeline::run`].
#[derive(Clone, Debug)]
pub struct RunOptions {
    /// Pause between frames.
    pub interval: Duration,
    /// Stop after this many frames were pulled from the source.
    pub max_frames: Option<u64>,
    pub health_interval: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            interval: Duration::ZERO,
            max_frames: None,
            health_interval: HEALTH_LOG_INTERVAL,
        }
    }
}

/// Counters returned by [`Pipeline::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames that produced an event.
    pub processed: u64,
    /// Frames abandoned on a frame-local error.
    pub skipped: u64,
    /// Events accepted by the event sink.
    pub emitted: u64,
}

impl PipelineStats {
    fn frames(&self) -> u64 {
        self.processed + self.skipped
    }
}

pub struct Pipeline {
    models: ModelContext,
    styles: AnnotationStyles,
    tolerance: Tolerance,
}

impl Pipeline {
    pub fn new(models: ModelContext, tolerance: Tolerance) -> Self {
        Self {
            models,
            styles: AnnotationStyles::default(),
            tolerance,
        }
    }

    /// Load models and tolerance from a validated configuration.
    pub fn from_config(cfg: &WatchConfig) -> Result<Self> {
        let tolerance = cfg.tolerance()?;
        let models = ModelContext::from_config(cfg)?;
        Ok(Self::new(models, tolerance))
    }

    pub fn with_styles(mut self, styles: AnnotationStyles) -> Self {
        self.styles = styles;
        self
    }

    pub fn models(&self) -> &ModelContext {
        &self.models
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Carry one frame through detection, annotation and aggregation.
    ///
    /// Any detector failure abandons the frame: no partial event is built.
    /// The input frame is left untouched.
    pub fn process_frame(&mut self, frame: &Frame) -> Result<FrameEvent> {
        let detections = self.models.detect_all(frame)?;

        let mut annotated = frame.clone();
        for set in [&detections.doors, &detections.windows, &detections.people] {
            annotated = annotate(&annotated, set, self.styles.for_class(set.class()));
        }

        let fused = aggregate(
            &detections.people,
            &detections.doors,
            &detections.windows,
            self.tolerance,
        );
        let annotated = annotate_proximity(
            &annotated,
            fused.near_door,
            fused.near_window,
            &self.styles,
        );

        Ok(FrameEvent::new(frame.captured_at(), &fused, annotated))
    }

    /// Pull frames until the source is exhausted, `max_frames` is reached, or
    /// `stop` is set.
    ///
    /// Frame-local failures are logged and skipped. Publish failures are
    /// logged and ignored. Any other error ends the run.
    pub fn run<S, E>(
        &mut self,
        source: &mut S,
        publisher: &mut Publisher<E>,
        stop: &AtomicBool,
        opts: &RunOptions,
    ) -> Result<PipelineStats>
    where
        S: FrameSource + ?Sized,
        E: EventSink,
    {
        let mut stats = PipelineStats::default();
        let mut last_health_log = Instant::now();

        while !stop.load(Ordering::SeqCst) {
            if opts.max_frames.is_some_and(|max| stats.frames() >= max) {
                log::info!("frame limit reached");
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => Some(frame),
                Ok(None) => {
                    log::info!("source {} exhausted", source.stats().location);
                    break;
                }
                Err(err) if err.is_frame_local() => {
                    stats.skipped += 1;
                    log::warn!("frame skipped: {}", err);
                    None
                }
                Err(err) => return Err(err),
            };

            if let Some(frame) = frame {
                match self.process_frame(&frame) {
                    Ok(event) => {
                        let seq = stats.processed;
                        stats.processed += 1;
                        log::info!(
                            "frame {}: people={} doors={} windows={} near_door={} near_window={}",
                            seq,
                            event.people_count,
                            event.door_count,
                            event.window_count,
                            event.near_door,
                            event.near_window
                        );
                        match publisher.publish(seq, &event) {
                            Ok(_) => stats.emitted += 1,
                            Err(err) => {
                                log::warn!("event for frame {} not published: {}", seq, err)
                            }
                        }
                    }
                    Err(err) if err.is_frame_local() => {
                        stats.skipped += 1;
                        log::warn!("frame skipped: {}", err);
                    }
                    Err(err) => return Err(err),
                }
            }

            if last_health_log.elapsed() >= opts.health_interval {
                let source_stats = source.stats();
                log::info!(
                    "health source={} healthy={} captured={} processed={} skipped={} emitted={}",
                    source_stats.location,
                    source.is_healthy(),
                    source_stats.frames_captured,
                    stats.processed,
                    stats.skipped,
                    stats.emitted
                );
                last_health_log = Instant::now();
            }

            pause(opts.interval, stop);
        }

        log::info!(
            "pipeline stopped: processed={} skipped={} emitted={}",
            stats.processed,
            stats.skipped,
            stats.emitted
        );
        Ok(stats)
    }
}

// Sleeps in short slices so a stop request is seen promptly.
fn pause(interval: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + interval;
    loop {
        if stop.load(Ordering::SeqCst) {
            return;
        }
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        std::thread::sleep((deadline - now).min(STOP_POLL));
    }
}
