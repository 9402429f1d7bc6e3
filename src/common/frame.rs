use image::{DynamicImage, RgbImage};

/// A single RGB video frame. Annotation mutates it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub image: RgbImage,
    pub index: u64,
}

impl std::ops::Deref for Frame {
    type Target = RgbImage;

    fn deref(&self) -> &Self::Target {
        &self.image
    }
}

impl std::ops::DerefMut for Frame {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.image
    }
}

impl From<DynamicImage> for Frame {
    fn from(image: DynamicImage) -> Self {
        Self {
            image: image.to_rgb8(),
            ..Default::default()
        }
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self {
            image,
            ..Default::default()
        }
    }
}

impl From<Frame> for RgbImage {
    fn from(frame: Frame) -> Self {
        frame.image
    }
}

impl Frame {
    pub fn new(image: RgbImage, index: u64) -> Self {
        Self { image, index }
    }

    pub fn with_index(mut self, index: u64) -> Self {
        self.index = index;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
