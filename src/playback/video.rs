//! Video file decoding with FFmpeg on a capture thread.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use crate::common::Frame;
use crate::playback::FrameSource;

const FRAME_QUEUE: usize = 4;

/// Frames of a video file, decoded ahead on a worker thread.
pub struct VideoFileSource {
    rx: Receiver<Result<RgbImage>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    next_index: u64,
}

impl VideoFileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (ready_tx, ready_rx) = bounded::<Result<(u32, u32)>>(1);
        let (tx, rx) = bounded(FRAME_QUEUE);
        let stop = Arc::new(AtomicBool::new(false));

        let worker_stop = stop.clone();
        let worker_path = path.clone();
        let handle = std::thread::Builder::new()
            .name("video-capture".to_string())
            .spawn(move || capture(worker_path, ready_tx, tx, worker_stop))
            .context("spawn video capture thread")?;

        let (width, height) = ready_rx
            .recv()
            .context("video capture thread exited before opening the file")??;
        log::info!("Video source: {} ({}x{})", path.display(), width, height);

        Ok(Self {
            rx,
            stop,
            handle: Some(handle),
            next_index: 0,
        })
    }
}

impl FrameSource for VideoFileSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self.rx.recv() {
            Ok(Ok(image)) => {
                let frame = Frame::new(image, self.next_index);
                self.next_index += 1;
                Ok(Some(frame))
            }
            // the decoder stops at its first error, so this ends the stream
            Ok(Err(err)) => {
                log::warn!("Frame {}: video decoding stopped: {:#}", self.next_index, err);
                Ok(None)
            }
            // sender dropped: end of stream
            Err(_) => Ok(None),
        }
    }
}

impl Drop for VideoFileSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // unblock a worker waiting on a full queue
        for _ in self.rx.try_iter() {}
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Video capture thread panicked");
            }
        }
    }
}

fn capture(path: PathBuf, ready: Sender<Result<(u32, u32)>>, tx: Sender<Result<RgbImage>>, stop: Arc<AtomicBool>) {
    let mut decoder = match VideoDecoder::open(&path) {
        Ok(decoder) => {
            if ready.send(Ok((decoder.decoder.width(), decoder.decoder.height()))).is_err() {
                log::debug!("Video source dropped before capture started");
                return;
            }
            decoder
        }
        Err(err) => {
            if ready.send(Err(err)).is_err() {
                log::warn!("Cannot open {} and the video source is gone", path.display());
            }
            return;
        }
    };

    let result = decoder.run(|image| tx.send(Ok(image)).is_ok() && !stop.load(Ordering::SeqCst));
    if let Err(err) = result {
        if tx.send(Err(err)).is_err() {
            log::debug!("Video source dropped before the decode error was delivered");
        }
    }
}

struct VideoDecoder {
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
}

impl VideoDecoder {
    fn open(path: &Path) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(&path)
            .with_context(|| format!("failed to open '{}' with ffmpeg", path.display()))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            input,
            stream_index,
            decoder,
            scaler,
        })
    }

    /// Decodes until the end of the file or until `emit` returns false.
    fn run(&mut self, mut emit: impl FnMut(RgbImage) -> bool) -> Result<()> {
        for (stream, packet) in self.input.packets() {
            if stream.index() != self.stream_index {
                continue;
            }
            self.decoder
                .send_packet(&packet)
                .context("send packet to ffmpeg decoder")?;
            if !drain(&mut self.decoder, &mut self.scaler, &mut emit)? {
                return Ok(());
            }
        }

        self.decoder.send_eof().context("flush ffmpeg decoder")?;
        drain(&mut self.decoder, &mut self.scaler, &mut emit)?;
        Ok(())
    }
}

fn drain(
    decoder: &mut ffmpeg::codec::decoder::Video,
    scaler: &mut ffmpeg::software::scaling::Context,
    emit: &mut impl FnMut(RgbImage) -> bool,
) -> Result<bool> {
    let mut decoded = ffmpeg::frame::Video::empty();
    let mut rgb_frame = ffmpeg::frame::Video::empty();
    while decoder.receive_frame(&mut decoded).is_ok() {
        scaler
            .run(&decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        if !emit(frame_to_image(&rgb_frame)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn frame_to_image(frame: &ffmpeg::frame::Video) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(
            data.get(start..start + row_bytes)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    RgbImage::from_raw(width, height, pixels).context("ffmpeg frame has an unexpected size")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_from(rx: Receiver<Result<RgbImage>>, handle: Option<JoinHandle<()>>) -> VideoFileSource {
        VideoFileSource {
            rx,
            stop: Arc::new(AtomicBool::new(false)),
            handle,
            next_index: 0,
        }
    }

    #[test]
    fn decode_error_ends_the_stream() {
        let (tx, rx) = bounded(FRAME_QUEUE);
        tx.send(Ok(RgbImage::new(8, 6))).unwrap();
        tx.send(Err(anyhow::anyhow!("corrupt packet"))).unwrap();
        let mut source = source_from(rx, None);

        let first = source.next_frame().unwrap().unwrap();
        assert_eq!((first.index, first.dimensions()), (0, (8, 6)));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn panicked_capture_thread_is_joined_on_drop() {
        let (_tx, rx) = bounded(FRAME_QUEUE);
        let handle = std::thread::spawn(|| panic!("decoder crashed"));
        drop(source_from(rx, Some(handle)));
    }

    #[test]
    fn missing_file_fails_to_open() {
        assert!(VideoFileSource::open("/nonexistent/clip.mp4").is_err());
    }
}
