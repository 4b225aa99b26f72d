//! # image-effect
//!
//! An interactive command-line tool that opens an image from disk or over
//! HTTP, then lets you show, resize, filter and save it. Pixel work is done
//! by one of two interchangeable engines picked at startup.
//!
//! # Architecture
//!
//! ```text
//! Session ──▶ ImageService<B> ──▶ B: ImageBackend ──▶ B::Handle
//!  (menu)       (facade)          raster | array      (image data)
//! ```
//!
//! The session never touches pixels. It collects input, validates it and
//! calls the facade. The facade owns exactly one backend and one handle and
//! replaces the handle on every resize or filter.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Backend trait, both engines, crop math, filter registry, load/save plumbing |
//! | [`service`] | [`ImageService`](service::ImageService) facade: ready-or-failed construction, handle ownership |
//! | [`session`] | Interactive menu loop over any `BufRead`/`Write` pair |
//! | [`config`] | `image-effect.toml` loading, merging and validation |
//! | [`output`] | Pure `format_*` functions for menus, info and filter catalogs |
//!
//! # Design Decisions
//!
//! ## One Backend per Session
//!
//! The backend is a type parameter of the facade, not a runtime tag. Each
//! engine has its own handle type, so a `RasterImage` can never reach the
//! array engine's operations. `main` matches on the configured
//! [`BackendKind`](imaging::BackendKind) once and everything after that is
//! monomorphic.
//!
//! ## Crop Before Scale
//!
//! Resizing never stretches. The image is first cropped symmetrically toward
//! the target aspect ratio along one axis, then scaled to the exact target
//! size. The crop math is a pure function in `imaging::calculations` so it
//! can be tested without decoding anything.
//!
//! ## Filters Reject, Never Clamp
//!
//! Each backend has a static filter registry. Parameters are merged over
//! documented defaults, and unknown names or out-of-range values are
//! rejected before the transform runs. Callers get the resolved parameters
//! back, including which ones were defaulted.

pub mod config;
pub mod imaging;
pub mod output;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
