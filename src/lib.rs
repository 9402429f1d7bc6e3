mod utils;
pub mod annotator;
pub mod common;
pub mod data;
pub mod detection_processing;
pub mod detection_ranker;
pub mod detection_runners;
pub mod error;
pub mod image_ops;
pub mod playback;

use std::time::Instant;
use crate::data::DetectorConfig;
use crate::detection_processing::FrameProcessor;
use crate::detection_runners::OrtDetector;
use crate::playback::{FrameSink, FrameSource, PlaybackLoop, PlaybackSummary};

pub use crate::error::{DetectError, Result};

/// Loads the model described by `config` and wraps it in a [`FrameProcessor`].
pub fn init_processor(config: &DetectorConfig) -> Result<FrameProcessor<OrtDetector>> {
    log::info!(
        "Initializing ORT session for {} with ({}) execution provider",
        config.model_path.display(),
        config.inference_device
    );
    let now = Instant::now();
    let processor = FrameProcessor::from_config(config)?;
    log::info!("Detector ready in {:?}", now.elapsed());
    Ok(processor)
}

/// Runs `source` through a freshly initialized processor into `sink`.
pub fn run_playback<S: FrameSource, K: FrameSink>(
    config: &DetectorConfig,
    playback: &mut PlaybackLoop<S, K>,
) -> anyhow::Result<PlaybackSummary> {
    let mut processor = init_processor(config)?;
    let now = Instant::now();
    let summary = playback.run(&mut processor)?;
    log::info!(
        "Processed {} frame(s) in {:?} | fire: {} | smoke: {}",
        summary.frames,
        now.elapsed(),
        summary.fire_frames,
        summary.smoke_frames
    );
    Ok(summary)
}
