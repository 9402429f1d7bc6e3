mod bounding_box;
mod detection;
mod dominant_label;
mod frame;
mod inference_device;

pub use bounding_box::*;
pub use detection::*;
pub use dominant_label::*;
pub use frame::*;
pub use inference_device::*;
