//! Thin asset adapters
//!
//! Mesh and image files are decoded here into the in-memory forms the
//! renderer uploads: a vertex list and tightly packed RGBA8 pixels.

pub mod image_loader;
pub mod obj_loader;

pub use image_loader::ImageData;
pub use obj_loader::load_obj;

use thiserror::Error;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// OBJ parsing failed
    #[error("OBJ load failed for {path}: {reason}")]
    Obj {
        /// Source path
        path: String,
        /// Loader message
        reason: String,
    },

    /// Image decoding failed
    #[error("Image load failed: {0}")]
    Image(#[from] image::ImageError),

    /// File parsed but contained no usable data
    #[error("Asset is empty: {0}")]
    Empty(String),
}
