//! Hand an image to an external viewer.
//!
//! The image is written as PNG to one per-process file in the temp directory
//! (overwritten by each show) and opened with the configured command, or the
//! platform opener (`xdg-open`, `open`, `cmd /C start`). The call blocks until
//! that command exits.

use super::backend::BackendError;
use image::{DynamicImage, ImageError, ImageFormat};
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Write a preview file and open it.
pub fn show_image(image: &DynamicImage, command: Option<&str>) -> Result<(), BackendError> {
    let path = preview_path();
    write_preview(image, &path)?;
    open_file(&path, command)
}

fn write_preview(image: &DynamicImage, path: &Path) -> Result<(), BackendError> {
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| match e {
            ImageError::IoError(io) => BackendError::Io(io),
            other => BackendError::ProcessingFailed(format!("Failed to write preview: {other}")),
        })
}

/// One preview file per process; each show overwrites the last.
fn preview_path() -> PathBuf {
    std::env::temp_dir().join(format!("image-effect-preview-{}.png", std::process::id()))
}

/// Split a viewer command line into program and leading arguments.
fn viewer_command(command: Option<&str>) -> Option<(String, Vec<String>)> {
    match command.map(str::split_whitespace) {
        Some(mut parts) => {
            let program = parts.next()?.to_string();
            Some((program, parts.map(String::from).collect()))
        }
        None => Some(platform_opener()),
    }
}

fn platform_opener() -> (String, Vec<String>) {
    if cfg!(target_os = "macos") {
        ("open".into(), vec!["-W".into()])
    } else if cfg!(target_os = "windows") {
        // Empty first argument is the window title
        (
            "cmd".into(),
            vec!["/C".into(), "start".into(), "/WAIT".into(), String::new()],
        )
    } else {
        ("xdg-open".into(), Vec::new())
    }
}

fn open_file(path: &Path, command: Option<&str>) -> Result<(), BackendError> {
    let (program, args) = viewer_command(command)
        .ok_or_else(|| BackendError::Viewer("viewer command is empty".into()))?;
    debug!("Opening {} with {program} {args:?}", path.display());
    let status = Command::new(&program)
        .args(&args)
        .arg(path)
        .status()
        .map_err(|e| BackendError::Viewer(format!("could not run '{program}': {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(BackendError::Viewer(format!("'{program}' exited with {status}")))
    }
}
