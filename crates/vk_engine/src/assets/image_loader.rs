//! Image loading for texture data

use std::path::Path;

use crate::assets::AssetError;

/// Decoded RGBA8 image ready for GPU upload
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Raw RGBA pixel data
    pub data: Vec<u8>,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

impl ImageData {
    /// Load an image from a file path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AssetError> {
        let path_ref = path.as_ref();
        log::debug!("Loading image from: {:?}", path_ref);

        let rgba = image::open(path_ref)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(AssetError::Empty(path_ref.display().to_string()));
        }

        log::info!("Loaded image {}x{} from {:?}", width, height, path_ref);
        Ok(Self {
            data: rgba.into_raw(),
            width,
            height,
        })
    }

    /// Create a solid color image
    pub fn solid_color(width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixel_count = (width * height) as usize;
        Self {
            data: color.repeat(pixel_count),
            width,
            height,
        }
    }

    /// Size of the pixel data in bytes
    pub fn size_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_color_layout() {
        let image = ImageData::solid_color(2, 3, [1, 2, 3, 4]);
        assert_eq!(image.size_bytes(), 24);
        assert_eq!(&image.data[4..8], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_png_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();

        let loaded = ImageData::from_file(&path).unwrap();
        assert_eq!((loaded.width, loaded.height), (4, 2));
        assert_eq!(&loaded.data[0..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(ImageData::from_file("does/not/exist.png").is_err());
    }
}
