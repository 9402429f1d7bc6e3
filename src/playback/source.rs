use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use crate::common::Frame;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

/// Anything that yields frames in order. `Ok(None)` means the source is exhausted.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        (**self).next_frame()
    }
}

/// A single image, or every image of a directory in lexical file name order.
#[derive(Debug)]
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl ImageSequenceSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let paths = if path.is_dir() {
            let mut paths: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("Cannot list {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            paths.sort();
            paths
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            anyhow::bail!("{} does not exist", path.display());
        };

        if paths.is_empty() {
            anyhow::bail!("No images found in {}", path.display());
        }
        log::info!("Image source: {} frame(s) from {}", paths.len(), path.display());

        Ok(Self { paths, next: 0 })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    /// Undecodable files are logged and skipped. Frame indices follow file
    /// positions, so a skipped file leaves a gap.
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        while let Some(path) = self.paths.get(self.next) {
            let index = self.next as u64;
            self.next += 1;
            match image::open(path) {
                Ok(image) => return Ok(Some(Frame::from(image).with_index(index))),
                Err(err) => log::warn!("Frame {}: skipping {}: {}", index, path.display(), err),
            }
        }
        Ok(None)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}
