//! Save-path resolution and encoding shared by both backends.

use super::backend::SaveError;
use image::{ColorType, DynamicImage, ImageError, ImageFormat};
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Format for a path's extension, if it is one we can write.
pub fn writable_format(path: &Path) -> Option<ImageFormat> {
    ImageFormat::from_path(path)
        .ok()
        .filter(|format| format.writing_enabled())
}

/// Work out where a save actually goes and in which format.
///
/// - A recognized, writable extension is kept verbatim; otherwise
///   `default_ext` is appended (`photo` → `photo.png`,
///   `photo.xyz` → `photo.xyz.png`).
/// - If the path names an existing directory, the file goes there.
/// - If the directory is missing or absent, the file name is placed in
///   `output_dir`, which is created on demand.
pub fn resolve_destination(
    requested: &Path,
    output_dir: &Path,
    default_ext: &str,
) -> Result<(PathBuf, ImageFormat), SaveError> {
    let file_name = requested
        .file_name()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| SaveError::MissingFileName(requested.to_path_buf()))?;

    let (file_name, format) = match writable_format(requested) {
        Some(format) => (PathBuf::from(file_name), format),
        None => {
            let mut named = file_name.to_os_string();
            named.push(".");
            named.push(default_ext);
            let named = PathBuf::from(named);
            let format = ImageFormat::from_extension(default_ext).unwrap_or(ImageFormat::Png);
            (named, format)
        }
    };

    let directory = match requested.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && parent.is_dir() => parent.to_path_buf(),
        Some(parent) if !parent.as_os_str().is_empty() => {
            warn!(
                "Directory {} does not exist, saving into {}",
                parent.display(),
                output_dir.display()
            );
            ensure_dir(output_dir)?
        }
        _ => ensure_dir(output_dir)?,
    };

    Ok((directory.join(file_name), format))
}

fn ensure_dir(dir: &Path) -> Result<PathBuf, SaveError> {
    std::fs::create_dir_all(dir)?;
    Ok(dir.to_path_buf())
}

/// Encode `image` to `path` as `format`.
///
/// Color types the encoder cannot take are converted first: JPEG gets
/// 8-bit gray or RGB, GIF gets 8-bit RGB or RGBA.
pub fn write_image(image: &DynamicImage, path: &Path, format: ImageFormat) -> Result<(), SaveError> {
    let result = match encodable(image, format) {
        Some(converted) => converted.save_with_format(path, format),
        None => image.save_with_format(path, format),
    };
    result.map_err(|e| match e {
        ImageError::IoError(io) => SaveError::Io(io),
        other => SaveError::Encode {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;
    info!("Saved {}", path.display());
    Ok(())
}

/// An 8-bit copy when `format` cannot encode the image's color type as is.
fn encodable(image: &DynamicImage, format: ImageFormat) -> Option<DynamicImage> {
    match (format, image.color()) {
        (ImageFormat::Jpeg, ColorType::L8 | ColorType::Rgb8) => None,
        (ImageFormat::Jpeg, _) => Some(DynamicImage::ImageRgb8(image.to_rgb8())),
        (ImageFormat::Gif, ColorType::Rgb8 | ColorType::Rgba8) => None,
        (ImageFormat::Gif, _) => Some(DynamicImage::ImageRgba8(image.to_rgba8())),
        _ => None,
    }
}
