//! Utility functions for the matting pipeline.

pub mod image;

pub use self::image::{
    SUPPORTED_EXTENSIONS, dynamic_to_rgb, is_supported_image, list_images, load_image, save_image,
};

pub use crate::core::{init_tracing, init_tracing_with_default};
