//! fire_detect - fire and smoke detection over image sequences and video files
//!
//! Frames are resized, run through a YOLO ONNX model, annotated and written to an
//! output directory (or discarded when no `--output` is given).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use fire_detect::common::InferenceDevice;
use fire_detect::data::DetectorConfig;
use fire_detect::playback::{DirectorySink, FrameSink, FrameSource, ImageSequenceSource, NullSink, PlaybackLoop};

const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mkv", "mov", "webm", "m4v"];

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON config file. Defaults to <config dir>/fire_detect/config.json when present.
    #[arg(long, env = "FIRE_DETECT_CONFIG")]
    config: Option<PathBuf>,
    /// ONNX model, overrides the config file.
    #[arg(long)]
    model: Option<PathBuf>,
    /// Image file, directory of images, or video file.
    #[arg(long)]
    source: PathBuf,
    /// Directory for annotated frames. Runs headless when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Height every frame is resized to before detection.
    #[arg(long)]
    target_height: Option<u32>,
    /// IoU threshold for non-maximum suppression.
    #[arg(long)]
    iou: Option<f32>,
    /// Minimum confidence for detections and for the fire label.
    #[arg(long)]
    min_confidence: Option<f32>,
    /// Minimum confidence for the smoke label.
    #[arg(long)]
    smoke_confidence: Option<f32>,
    /// Execution provider: cpu, cuda or tensorrt.
    #[arg(long)]
    device: Option<String>,
    /// Log average stage timings every 100 frames.
    #[arg(long)]
    profile: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    let quit = Arc::new(AtomicBool::new(false));
    let handler_quit = quit.clone();
    ctrlc::set_handler(move || {
        log::info!("shutdown signal received, stopping after the current frame...");
        handler_quit.store(true, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    let source = open_source(&args.source)?;
    let sink: Box<dyn FrameSink> = match &args.output {
        Some(dir) => Box::new(DirectorySink::new(dir)?),
        None => Box::new(NullSink),
    };

    let mut playback = PlaybackLoop::new(source, sink).with_quit_flag(quit);
    let summary = fire_detect::run_playback(&config, &mut playback)?;
    println!("{}", serde_json::to_string(&summary)?);

    Ok(())
}

fn resolve_config(args: &Args) -> Result<DetectorConfig> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => DetectorConfig::default_path().ok().filter(|p| p.is_file()),
    };

    let mut config = match (path, &args.model) {
        (Some(path), _) => {
            log::info!("Loading config from {}", path.display());
            DetectorConfig::load(&path)?
        }
        (None, Some(model)) => DetectorConfig::new(model),
        (None, None) => return Err(anyhow!("either --config or --model is required")),
    };

    if let Some(model) = &args.model {
        config.model_path = model.clone();
    }
    if let Some(device) = &args.device {
        let device = InferenceDevice::from_str(device).ok_or_else(|| {
            anyhow!(
                "unknown device '{}', expected one of {:?}",
                device,
                InferenceDevice::all_inference_devices()
            )
        })?;
        config = config.with_device(device);
    }
    if let Some(target_height) = args.target_height {
        config = config.with_target_height(target_height);
    }
    if let Some(iou) = args.iou {
        config = config.with_iou(iou);
    }
    if let Some(conf) = args.min_confidence {
        config = config.with_min_confidence(conf);
    }
    if let Some(conf) = args.smoke_confidence {
        config = config.with_smoke_confidence(conf);
    }
    if args.profile {
        config = config.with_profile(true);
    }

    config.validate()?;
    Ok(config)
}

fn open_source(path: &Path) -> Result<Box<dyn FrameSource>> {
    let is_video = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false);

    if is_video {
        return open_video(path);
    }
    let source = ImageSequenceSource::open(path)
        .with_context(|| format!("cannot open source {}", path.display()))?;
    Ok(Box::new(source))
}

#[cfg(feature = "video-ffmpeg")]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(fire_detect::playback::VideoFileSource::open(path)?))
}

#[cfg(not(feature = "video-ffmpeg"))]
fn open_video(path: &Path) -> Result<Box<dyn FrameSource>> {
    Err(anyhow!(
        "{} is a video file; rebuild with `--features video-ffmpeg` to decode it",
        path.display()
    ))
}
