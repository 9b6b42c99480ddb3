pub mod decode;
pub mod dimensions;
pub mod encode;
pub mod image_transform;
pub mod orientation;
pub mod params;
pub mod resize;

pub use decode::decode_image;
pub use dimensions::{CropRect, ResizePlan, plan_resize};
pub use encode::encode_image;
pub use image_transform::{ImageCrateTransform, ImageTransform};
pub use orientation::Orientation;
pub use params::{OutputFormat, TransformParams};
pub use resize::resize_image;
