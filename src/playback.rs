//! Frame loop from a source, through the processor, to a sink.

mod sink;
mod source;
#[cfg(feature = "video-ffmpeg")]
mod video;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use anyhow::Result;
use serde::Serialize;
use crate::common::DominantLabel;
use crate::detection_processing::FrameProcessor;
use crate::detection_runners::Detector;

pub use sink::{DirectorySink, FrameSink, NullSink, SinkControl};
pub use source::{FrameSource, ImageSequenceSource};
#[cfg(feature = "video-ffmpeg")]
pub use video::VideoFileSource;

/// Frame counts of a finished run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaybackSummary {
    pub frames: u64,
    pub fire_frames: u64,
    pub smoke_frames: u64,
}

impl PlaybackSummary {
    fn count(&mut self, label: DominantLabel) {
        self.frames += 1;
        match label {
            DominantLabel::Fire => self.fire_frames += 1,
            DominantLabel::Smoke => self.smoke_frames += 1,
            DominantLabel::NoDetection => {}
        }
    }
}

pub struct PlaybackLoop<S: FrameSource, K: FrameSink> {
    source: S,
    sink: K,
    quit: Arc<AtomicBool>,
}

impl<S: FrameSource, K: FrameSink> PlaybackLoop<S, K> {
    pub fn new(source: S, sink: K) -> Self {
        Self {
            source,
            sink,
            quit: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shares an externally owned quit flag, e.g. one set from a Ctrl-C handler.
    pub fn with_quit_flag(mut self, quit: Arc<AtomicBool>) -> Self {
        self.quit = quit;
        self
    }

    pub fn quit_flag(&self) -> Arc<AtomicBool> {
        self.quit.clone()
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Processes frames until the source runs dry or quit is requested. Quit is
    /// only checked between frames.
    pub fn run<D: Detector>(&mut self, processor: &mut FrameProcessor<D>) -> Result<PlaybackSummary> {
        let mut summary = PlaybackSummary::default();
        let mut last_label = DominantLabel::NoDetection;

        while !self.quit.load(Ordering::SeqCst) {
            let Some(frame) = self.source.next_frame()? else {
                log::info!("Source exhausted after {} frame(s)", summary.frames);
                break;
            };

            let processed = processor.process(&frame);
            summary.count(processed.label);

            if processed.label != last_label {
                log::info!("Frame {}: {} -> {}", frame.index, last_label, processed.label);
                last_label = processed.label;
            }

            if self.sink.show(&processed.frame, processed.label)? == SinkControl::Quit {
                log::info!("Quit requested by sink");
                self.quit.store(true, Ordering::SeqCst);
            }
        }

        Ok(summary)
    }
}
