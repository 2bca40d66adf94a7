//! portalwatchd - people-near-opening watcher
//!
//! One-shot mode (`--image`) annotates a single picture, writes it to the
//! output directory and prints the event record. Otherwise frames are pulled
//! from the configured capture source until it runs dry or Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use portal_watch::{
    open_source, DirImageStore, Frame, JsonLinesSink, Pipeline, Publisher, RunOptions, WatchConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "portalwatchd",
    about = "Flag people standing next to doors and windows"
)]
struct Args {
    /// TOML config file (takes precedence over PORTAL_CONFIG)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Process a single image and exit
    #[arg(long, value_name = "PATH", conflicts_with = "source")]
    image: Option<PathBuf>,

    /// Capture source: image file, image directory, /dev/videoN or stub://name
    #[arg(long)]
    source: Option<String>,

    /// Directory for annotated images
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Event log (JSON lines)
    #[arg(long, value_name = "PATH")]
    events: Option<PathBuf>,

    /// Pause between frames
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Proximity tolerance in pixels
    #[arg(long)]
    epsilon: Option<f32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let cfg = load_config(&args)?;
    log::info!(
        "portalwatchd {} device={} collection={} epsilon={}",
        env!("CARGO_PKG_VERSION"),
        cfg.device_id,
        cfg.collection,
        cfg.epsilon
    );

    let mut pipeline = Pipeline::from_config(&cfg).context("failed to load detection models")?;

    match &args.image {
        Some(path) => run_once(&mut pipeline, &cfg, path),
        None => run_continuous(&mut pipeline, &cfg, args.max_frames),
    }
}

fn load_config(args: &Args) -> Result<WatchConfig> {
    let mut cfg = match &args.config {
        Some(path) => WatchConfig::load_from(Some(path)),
        None => WatchConfig::load(),
    }
    .context("failed to load configuration")?;

    if let Some(source) = &args.source {
        cfg.capture.source = source.clone();
    }
    if let Some(out) = &args.out {
        cfg.output.dir = out.clone();
    }
    if let Some(events) = &args.events {
        cfg.output.events_path = events.clone();
    }
    if let Some(ms) = args.interval_ms {
        cfg.capture.interval = Duration::from_millis(ms);
    }
    if let Some(epsilon) = args.epsilon {
        cfg.epsilon = epsilon;
    }
    cfg.validate().context("invalid command line override")?;
    Ok(cfg)
}

fn run_once(pipeline: &mut Pipeline, cfg: &WatchConfig, path: &Path) -> Result<()> {
    let frame = Frame::open(path)?;
    let event = pipeline
        .process_frame(&frame)
        .with_context(|| format!("failed to process {}", path.display()))?;

    std::fs::create_dir_all(&cfg.output.dir)
        .with_context(|| format!("failed to create {}", cfg.output.dir.display()))?;
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    let out_path = cfg.output.dir.join(format!("{}.jpg", stem));
    event.annotated_frame.save_jpeg(&out_path)?;
    log::info!("annotated image written to {}", out_path.display());

    let mut record = event.record();
    record.time = Some(event.epoch_s().to_string());
    record.img_url = Some(out_path.display().to_string());
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn run_continuous(
    pipeline: &mut Pipeline,
    cfg: &WatchConfig,
    max_frames: Option<u64>,
) -> Result<()> {
    let mut source = open_source(&cfg.capture)?;
    source
        .connect()
        .with_context(|| format!("failed to connect to {}", cfg.capture.source))?;

    let events = JsonLinesSink::open(&cfg.output.events_path)?;
    let images = DirImageStore::new(&cfg.output.dir, cfg.output.ring)?;
    let mut publisher =
        Publisher::new(&cfg.device_id, &cfg.collection, events).with_images(Box::new(images));
    log::info!(
        "writing events to {} and images to {}",
        publisher.sink().path().display(),
        cfg.output.dir.display()
    );

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        handler_stop.store(true, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let opts = RunOptions {
        interval: cfg.capture.interval,
        max_frames,
        ..RunOptions::default()
    };
    let stats = pipeline.run(&mut source, &mut publisher, &stop, &opts)?;
    if stop.load(Ordering::SeqCst) {
        log::info!("shutdown signal received");
    }
    log::info!(
        "portalwatchd done: {} events emitted, {} frames skipped",
        stats.emitted,
        stats.skipped
    );
    Ok(())
}
