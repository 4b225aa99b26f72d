//! Shared test utilities.
//!
//! Synthetic images and on-disk fixtures used by the backend, source and
//! session tests.
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = write_png(tmp.path(), "photo.png", 64, 48);
//! let image = gradient_image(64, 48);
//! ```

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// RGB image whose channels vary independently with position, so every
/// filter and resize has something to change.
pub fn gradient_image(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = ((x + y) * 7 % 256) as u8;
        Rgb([r, g, b])
    });
    DynamicImage::ImageRgb8(img)
}

/// Write a gradient as PNG bytes to `dir/name`, whatever the extension says.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    gradient_image(width, height)
        .save_with_format(&path, ImageFormat::Png)
        .unwrap();
    path
}

