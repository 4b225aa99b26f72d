//! The image service facade.
//!
//! An [`ImageService`] owns one backend and the one image currently being
//! edited. It exists only in the *ready* state: [`ImageService::open`]
//! either returns a service holding a decoded image or the [`LoadError`]
//! that prevented it. Nothing half-initialized is ever observable.
//!
//! The backend is fixed by the type parameter for the lifetime of the
//! service. Resize and filter calls swap the held handle for the new one
//! the backend returns.

use crate::imaging::{
    BackendError, BackendKind, FilterError, FilterKind, FilterParams, FilterRegistry, ImageBackend,
    ImageHandle, LoadError, ResolvedParams, SaveError, TargetSize,
};
use image::ImageFormat;
use log::info;
use std::path::{Path, PathBuf};

/// Snapshot of the current image for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub backend: BackendKind,
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub format: Option<ImageFormat>,
}

pub struct ImageService<B: ImageBackend> {
    backend: B,
    handle: B::Handle,
    source: String,
}

impl<B: ImageBackend> ImageService<B> {
    /// Load `source` with `backend`. Fails without producing a service.
    pub fn open(backend: B, source: &str) -> Result<Self, LoadError> {
        let handle = backend.load(source)?;
        Ok(Self {
            backend,
            handle,
            source: source.trim().to_string(),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn handle(&self) -> &B::Handle {
        &self.handle
    }

    /// Where the current image was loaded from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn info(&self) -> ImageInfo {
        ImageInfo {
            backend: self.backend.kind(),
            width: self.handle.width(),
            height: self.handle.height(),
            channels: self.handle.channels(),
            format: self.handle.format(),
        }
    }

    /// Replace the current image with a new source. On failure the current
    /// image is kept.
    pub fn reload(&mut self, source: &str) -> Result<(), LoadError> {
        self.handle = self.backend.load(source)?;
        self.source = source.trim().to_string();
        Ok(())
    }

    pub fn resize(&mut self, size: TargetSize) {
        let resized = self.backend.resize(&self.handle, size);
        info!(
            "Resized {}x{} → {}x{}",
            self.handle.width(),
            self.handle.height(),
            resized.width(),
            resized.height()
        );
        self.handle = resized;
    }

    /// Apply a filter and keep the result. Returns the parameters actually
    /// used so callers can report defaults.
    pub fn apply_filter(
        &mut self,
        kind: FilterKind,
        params: &FilterParams,
    ) -> Result<ResolvedParams, FilterError> {
        let applied = self.backend.apply_filter(&self.handle, kind, params)?;
        self.handle = applied.image;
        Ok(applied.params)
    }

    pub fn save(&self, path: &Path) -> Result<PathBuf, SaveError> {
        self.backend.save(&self.handle, path)
    }

    pub fn show(&self) -> Result<(), BackendError> {
        self.backend.show(&self.handle)
    }

    pub fn filters(&self) -> &FilterRegistry<B::Handle> {
        self.backend.filters()
    }
}
