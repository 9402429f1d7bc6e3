use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::common::{DominantLabel, Frame};
use crate::data::FsAccess;

/// What the loop should do after a frame has been shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkControl {
    Continue,
    Quit,
}

pub trait FrameSink {
    fn show(&mut self, frame: &Frame, label: DominantLabel) -> Result<SinkControl>;
}

impl<K: FrameSink + ?Sized> FrameSink for Box<K> {
    fn show(&mut self, frame: &Frame, label: DominantLabel) -> Result<SinkControl> {
        (**self).show(frame, label)
    }
}

/// Writes every frame as `frame_000000.png`, `frame_000001.png`, ...
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: u64,
}

impl DirectorySink {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        FsAccess::create_directory(&dir)
            .with_context(|| format!("Cannot create output directory {}", dir.display()))?;
        Ok(Self { dir, written: 0 })
    }

    pub fn frame_path(&self, n: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", n))
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for DirectorySink {
    fn show(&mut self, frame: &Frame, _label: DominantLabel) -> Result<SinkControl> {
        let path = self.frame_path(self.written);
        frame
            .image
            .save(&path)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        self.written += 1;
        Ok(SinkControl::Continue)
    }
}

/// Drops every frame, for headless runs.
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn show(&mut self, _frame: &Frame, _label: DominantLabel) -> Result<SinkControl> {
        Ok(SinkControl::Continue)
    }
}
