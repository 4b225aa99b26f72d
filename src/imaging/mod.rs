//! Image processing behind one backend trait.
//!
//! | Operation | [`RasterBackend`] | [`ArrayBackend`] |
//! |---|---|---|
//! | **Load** | local file or single HTTP GET, decoded by `image` | same, then copied into an `ndarray` |
//! | **Resize** | `resize_to_fill` (Lanczos3) | [`plan_crop`] + anti-aliased bilinear |
//! | **Save** | extension kept or default appended, missing dirs fall back to `output_dir` | same |
//! | **Show** | PNG preview handed to an external viewer | same |
//! | **Filters** | 8-bit kernels | float pipeline, rescaled to 0–255 |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop math (unit testable)
//! - **Parameters**: Target sizes, bounds, filter kinds and raw parameter maps
//! - **Filters**: The per-backend [`FilterRegistry`]
//! - **Backend**: [`ImageBackend`] trait, [`ImageHandle`], error types
//! - **Source / destination / viewer**: I/O shared by both backends

pub mod array_backend;
pub mod backend;
mod calculations;
mod destination;
pub mod filters;
mod params;
pub mod raster_backend;
mod source;
mod viewer;

pub use array_backend::{ArrayBackend, ArrayImage};
pub use backend::{
    BackendError, BackendSettings, FetchSettings, FilterError, ImageBackend, ImageHandle,
    LoadError, SaveError,
};
pub use calculations::{CropPlan, RATIO_TOLERANCE, plan_crop};
pub use filters::{Applied, FilterRegistry, ParamSpec, ResolvedParams};
pub use params::{
    BackendKind, FilterKind, FilterParams, ParamSyntaxError, ResizeBounds, SizeError, TargetSize,
    UnknownBackend, UnknownFilter, parse_filter_params,
};
pub use raster_backend::{RasterBackend, RasterImage};
