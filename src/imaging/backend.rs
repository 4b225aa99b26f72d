//! Image backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the five operations every engine must
//! support: load, resize, save, show and apply_filter. Each engine brings its
//! own [`Handle`](ImageBackend::Handle) type, so a handle decoded by one
//! backend cannot be handed to the other. The compiler enforces it.
//!
//! | Operation | [`RasterBackend`](super::RasterBackend) | [`ArrayBackend`](super::ArrayBackend) |
//! |---|---|---|
//! | Handle | `DynamicImage` | `Array3<u8>` as `(height, width, channel)` |
//! | Resize | `resize_to_fill` (Lanczos3) | [`plan_crop`](super::plan_crop) + anti-aliased bilinear |
//! | Default extension | decoded format, else `png` | always `png` |
//! | Filters | 8-bit kernels | float pipeline rescaled to 0–255 |

use super::filters::{Applied, FilterRegistry};
use super::params::{BackendKind, FilterKind, FilterParams, TargetSize};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Why a source could not be turned into a handle.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("'{0}' is neither an existing file nor an http(s) URL")]
    NotFound(String),
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url} answered with HTTP {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("Failed to decode {origin}: {reason}")]
    Decode { origin: String, reason: String },
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("'{0}' has no file name")]
    MissingFileName(PathBuf),
    #[error("Encoding {path} failed: {reason}")]
    Encode { path: PathBuf, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("{backend} backend has no '{kind}' filter")]
    NotRegistered { backend: BackendKind, kind: FilterKind },
    #[error("'{kind}' has no parameter '{name}' (known: {known})")]
    UnknownParameter {
        kind: FilterKind,
        name: String,
        known: String,
    },
    #[error("'{kind}' parameter '{name}' must be within {min}..={max}, got {value}")]
    OutOfRange {
        kind: FilterKind,
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Viewer failed: {0}")]
    Viewer(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Network limits for URL sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
        }
    }
}

/// Everything a backend needs besides the image itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSettings {
    /// Fallback directory for saves whose directory is missing or absent.
    pub output_dir: PathBuf,
    pub fetch: FetchSettings,
    /// Viewer command line; `None` uses the platform opener.
    pub viewer: Option<String>,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("saved_images"),
            fetch: FetchSettings::default(),
            viewer: None,
        }
    }
}

/// What every decoded image exposes, whatever its native representation.
pub trait ImageHandle {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn channels(&self) -> u8;
    /// Container format the pixels were decoded from, if known.
    fn format(&self) -> Option<ImageFormat>;
}

/// Trait for image backends.
///
/// Operations never mutate a handle: `resize` and `apply_filter` return a new
/// one and the caller replaces its reference.
pub trait ImageBackend {
    type Handle: ImageHandle;

    fn kind(&self) -> BackendKind;

    /// Open `source` as a local file if one exists at that path, otherwise
    /// fetch it with a single HTTP GET.
    fn load(&self, source: &str) -> Result<Self::Handle, LoadError>;

    /// Center-crop toward the target aspect ratio, then scale to exactly
    /// `size`.
    fn resize(&self, handle: &Self::Handle, size: TargetSize) -> Self::Handle;

    /// Write the image and return the path actually written.
    fn save(&self, handle: &Self::Handle, path: &Path) -> Result<PathBuf, SaveError>;

    /// Display the image; blocks until the viewer returns.
    fn show(&self, handle: &Self::Handle) -> Result<(), BackendError>;

    /// The filter table for this backend, built once.
    fn filters(&self) -> &FilterRegistry<Self::Handle>;

    /// Apply a filter with `params` merged over this backend's defaults.
    fn apply_filter(
        &self,
        handle: &Self::Handle,
        kind: FilterKind,
        params: &FilterParams,
    ) -> Result<Applied<Self::Handle>, FilterError> {
        self.filters().apply(handle, kind, params)
    }

    /// Extension appended when a save path has no recognized one.
    fn default_extension(&self, handle: &Self::Handle) -> &'static str;
}
