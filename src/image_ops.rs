//! File/code adapted from https://github.com/jamjamjon/usls
//!
//! Frame resizing and model input preparation.

use anyhow::bail;
use fast_image_resize::{
    images::{CroppedImageMut, Image as FirImage, ImageRef},
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
};
use image::RgbImage;
use crate::common::Frame;
use crate::error::{DetectError, Result};

/// Width of a frame rescaled to `target_height`, preserving aspect ratio.
pub fn scaled_width(width: u32, height: u32, target_height: u32) -> u32 {
    let aspect_ratio = width as f64 / height as f64;
    ((target_height as f64 * aspect_ratio).round() as u32).max(1)
}

/// Rescales `frame` to exactly `target_height` rows, keeping the aspect ratio.
///
/// Returns a new buffer; the input frame is left untouched. Zero-sized input is
/// rejected with [`DetectError::InvalidFrame`].
pub fn resize_to_height(frame: &Frame, target_height: u32) -> Result<Frame> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 || target_height == 0 {
        return Err(DetectError::InvalidFrame { width, height });
    }

    let new_width = scaled_width(width, height, target_height);
    let resized = resize_exact(&frame.image, new_width, target_height)?;
    Ok(Frame::new(resized, frame.index))
}

/// Bilinear resize of an RGB image to `target_w` x `target_h`.
pub fn resize_exact(image: &RgbImage, target_w: u32, target_h: u32) -> Result<RgbImage> {
    let (w0, h0) = image.dimensions();
    if w0 == 0 || h0 == 0 || target_w == 0 || target_h == 0 {
        return Err(DetectError::InvalidFrame { width: w0, height: h0 });
    }
    if (w0, h0) == (target_w, target_h) {
        return Ok(image.clone());
    }

    let src = ImageRef::new(w0, h0, image.as_raw(), PixelType::U8x3)
        .map_err(|e| DetectError::Resize(e.to_string()))?;
    let mut dst = FirImage::new(target_w, target_h, PixelType::U8x3);

    let mut resizer = Resizer::new();
    resizer
        .resize(&src, &mut dst, &bilinear())
        .map_err(|e| DetectError::Resize(e.to_string()))?;

    RgbImage::from_raw(target_w, target_h, dst.into_vec())
        .ok_or_else(|| DetectError::Resize("resized buffer has unexpected size".to_string()))
}

fn bilinear() -> ResizeOptions {
    ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear))
}

/// Scales `image` into a `target_w` x `target_h` canvas filled with `bg`,
/// anchored at the top-left corner.
///
/// Returns the canvas and the scale factor applied to the source.
pub fn letterbox(
    image: &RgbImage,
    target_w: u32,
    target_h: u32,
    bg: u8,
    resizer: &mut Resizer,
) -> anyhow::Result<(FirImage<'static>, f32)> {
    let (w0, h0) = image.dimensions();
    if w0 == 0 || h0 == 0 {
        bail!("Cannot letterbox an empty image ({}x{})", w0, h0);
    }
    let scale = (target_w as f32 / w0 as f32).min(target_h as f32 / h0 as f32);
    let new_w = ((w0 as f32 * scale).round() as u32).clamp(1, target_w);
    let new_h = ((h0 as f32 * scale).round() as u32).clamp(1, target_h);

    let mut padded = FirImage::from_vec_u8(
        target_w,
        target_h,
        vec![bg; (target_w * target_h * 3) as usize],
        PixelType::U8x3,
    )?;

    let src = ImageRef::new(w0, h0, image.as_raw(), PixelType::U8x3)?;
    let mut cropped = CroppedImageMut::new(&mut padded, 0, 0, new_w, new_h)?;
    resizer.resize(&src, &mut cropped, &bilinear())?;

    Ok((padded, scale))
}

/// Packed RGB u8 (HWC) to planar f32 (CHW) scaled into [0, 1].
pub fn nchw_normalize_flat(buf: &[u8], w: usize, h: usize) -> anyhow::Result<Vec<f32>> {
    if buf.len() != w * h * 3 {
        bail!("Unexpected buffer size: got {}, expected {}", buf.len(), w * h * 3);
    }

    let hw = w * h;
    let mut out = vec![0.0f32; buf.len()];

    for i in 0..hw {
        out[i] = buf[3 * i] as f32 / 255.0;
        out[i + hw] = buf[3 * i + 1] as f32 / 255.0;
        out[i + 2 * hw] = buf[3 * i + 2] as f32 / 255.0;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn frame(w: u32, h: u32) -> Frame {
        Frame::from(RgbImage::from_pixel(w, h, Rgb([10, 20, 30])))
    }

    #[test]
    fn output_height_is_exact_and_width_rounds() {
        for (w, h, target) in [(1920, 1080, 640), (640, 480, 640), (333, 777, 640), (1, 3, 640), (5, 7, 1)] {
            let out = resize_to_height(&frame(w, h), target).unwrap();
            let expected_w = ((target as f64 * w as f64 / h as f64).round() as u32).max(1);
            assert_eq!(out.dimensions(), (expected_w, target), "input {w}x{h}");
        }
    }

    #[test]
    fn widescreen_to_640() {
        let out = resize_to_height(&frame(1920, 1080), 640).unwrap();
        // 640 * 16 / 9 = 1137.78
        assert_eq!(out.dimensions(), (1138, 640));
    }

    #[test]
    fn inverse_resize_restores_dimensions() {
        let src = frame(1280, 720);
        let small = resize_to_height(&src, 640).unwrap();
        let back = resize_exact(&small.image, 1280, 720).unwrap();
        assert_eq!(back.dimensions(), src.dimensions());
    }

    #[test]
    fn input_is_not_modified() {
        let src = frame(300, 200);
        let copy = src.clone();
        let _ = resize_to_height(&src, 640).unwrap();
        assert_eq!(src, copy);
    }

    #[test]
    fn keeps_frame_index() {
        let src = frame(300, 200).with_index(42);
        assert_eq!(resize_to_height(&src, 100).unwrap().index, 42);
    }

    #[test]
    fn zero_dimension_is_rejected() {
        let err = resize_to_height(&frame(0, 10), 640).unwrap_err();
        assert!(matches!(err, DetectError::InvalidFrame { width: 0, height: 10 }));
        assert!(resize_to_height(&frame(10, 10), 0).is_err());
    }

    #[test]
    fn letterbox_pads_right_and_bottom() {
        let img = RgbImage::from_pixel(200, 100, Rgb([0, 0, 0]));
        let mut resizer = Resizer::new();
        let (boxed, scale) = letterbox(&img, 64, 64, 114, &mut resizer).unwrap();
        assert!((scale - 0.32).abs() < 1e-6);
        assert_eq!((boxed.width(), boxed.height()), (64, 64));
        let buf = boxed.buffer();
        // top-left is image content, bottom-left is padding
        assert_eq!(buf[0], 0);
        let last_row = (63 * 64) * 3;
        assert_eq!(buf[last_row], 114);
    }

    #[test]
    fn nchw_layout() {
        let buf = [1u8, 2, 3, 4, 5, 6];
        let out = nchw_normalize_flat(&buf, 2, 1).unwrap();
        let expect: Vec<f32> = [1., 4., 2., 5., 3., 6.].iter().map(|v| v / 255.).collect();
        assert_eq!(out, expect);
        assert!(nchw_normalize_flat(&buf, 3, 1).is_err());
    }
}
