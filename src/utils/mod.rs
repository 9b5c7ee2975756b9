pub mod image_ops;

pub use image_ops::{
    encode_jpeg, encode_png, is_jpeg_path, load_dynamic_image, load_image, load_image_from_memory,
};
