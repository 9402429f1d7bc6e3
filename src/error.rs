use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Failed to load model: {0:#}")]
    ModelLoad(anyhow::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid frame: {width}x{height}")]
    InvalidFrame { width: u32, height: u32 },
    #[error("Class id {class_id} is outside the {num_classes} known class names")]
    UnknownClass { class_id: usize, num_classes: usize },
    #[error("Box ({x1}, {y1}, {x2}, {y2}) does not lie inside the {width}x{height} frame")]
    InvalidBox { x1: i32, y1: i32, x2: i32, y2: i32, width: u32, height: u32 },
    #[error("Resize failed: {0}")]
    Resize(String),
    #[error("Detector error: {0:#}")]
    Detector(anyhow::Error),
}

pub type Result<T, E = DetectError> = std::result::Result<T, E>;
