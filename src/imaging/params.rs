//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how*. They are the vocabulary
//! shared by the [`service`](crate::service) facade, the interactive session
//! and both backends.
//!
//! ## Types
//!
//! - [`BackendKind`]: which engine a session runs on (`raster` or `array`).
//! - [`ResizeBounds`]: closed range every target dimension must fall in.
//! - [`TargetSize`]: a validated `(width, height)` pair. Only constructible
//!   through [`ResizeBounds::check`], so backends never see zero or
//!   out-of-range dimensions.
//! - [`FilterKind`]: the closed set `blur | sharpen | smooth | custom`.
//! - [`FilterParams`]: raw caller-supplied `name → value` map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raw filter parameters as supplied by the caller.
///
/// Keys absent from the map fall back to the per-backend defaults listed in
/// the filter registry.
pub type FilterParams = BTreeMap<String, f64>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeError {
    #[error("'{0}' is not a whole number of pixels")]
    NotANumber(String),
    #[error("{axis} must be between {min} and {max} px, got {value}")]
    OutOfRange {
        axis: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown backend '{0}' (expected 'raster' or 'array')")]
pub struct UnknownBackend(pub String);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown filter '{0}' (expected one of: blur, sharpen, smooth, custom)")]
pub struct UnknownFilter(pub String);

/// The two interchangeable engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Boxed bitmap object (`image::DynamicImage`).
    #[default]
    Raster,
    /// Raw `(height, width, channel)` numeric array.
    Array,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Raster => "raster",
            BackendKind::Array => "array",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raster" | "pil" => Ok(BackendKind::Raster),
            "array" | "ski" => Ok(BackendKind::Array),
            _ => Err(UnknownBackend(s.to_string())),
        }
    }
}

/// Inclusive bounds applied to both target dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeBounds {
    pub min: u32,
    pub max: u32,
}

impl Default for ResizeBounds {
    fn default() -> Self {
        Self { min: 120, max: 1080 }
    }
}

impl ResizeBounds {
    /// Validate a `(width, height)` pair and produce a [`TargetSize`].
    pub fn check(&self, width: u32, height: u32) -> Result<TargetSize, SizeError> {
        self.check_axis("width", width)?;
        self.check_axis("height", height)?;
        Ok(TargetSize { width, height })
    }

    /// Parse and validate user-typed dimensions.
    pub fn parse(&self, width: &str, height: &str) -> Result<TargetSize, SizeError> {
        let parse = |raw: &str| {
            raw.trim()
                .parse::<u32>()
                .map_err(|_| SizeError::NotANumber(raw.trim().to_string()))
        };
        self.check(parse(width)?, parse(height)?)
    }

    fn check_axis(&self, axis: &'static str, value: u32) -> Result<(), SizeError> {
        if (self.min..=self.max).contains(&value) {
            Ok(())
        } else {
            Err(SizeError::OutOfRange {
                axis,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

/// Exact output dimensions for a resize, already validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSize {
    width: u32,
    height: u32,
}

impl TargetSize {
    pub fn width(self) -> u32 {
        self.width
    }

    pub fn height(self) -> u32 {
        self.height
    }
}

impl fmt::Display for TargetSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The closed set of filter categories. Identity is stable across backends;
/// what each kind does is not (see the filter registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKind {
    Blur,
    Sharpen,
    Smooth,
    /// Backend-specific composite. Not portable between backends.
    Custom,
}

impl FilterKind {
    pub const ALL: [FilterKind; 4] = [
        FilterKind::Blur,
        FilterKind::Sharpen,
        FilterKind::Smooth,
        FilterKind::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FilterKind::Blur => "blur",
            FilterKind::Sharpen => "sharpen",
            FilterKind::Smooth => "smooth",
            FilterKind::Custom => "custom",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| UnknownFilter(s.trim().to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamSyntaxError {
    #[error("expected 'name=value', got '{0}'")]
    MissingEquals(String),
    #[error("value for '{name}' is not a number: '{value}'")]
    NotANumber { name: String, value: String },
}

/// Parse `radius=3, sigma=1.5` style input into a [`FilterParams`] map.
///
/// Pairs are separated by commas; whitespace around names, `=` and values is
/// ignored. Names are lowercased. An empty string yields an empty map (all
/// defaults).
pub fn parse_filter_params(input: &str) -> Result<FilterParams, ParamSyntaxError> {
    let mut params = FilterParams::new();
    for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| ParamSyntaxError::MissingEquals(pair.to_string()))?;
        let number = value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParamSyntaxError::NotANumber {
                name: name.trim().to_string(),
                value: value.trim().to_string(),
            })?;
        params.insert(name.trim().to_ascii_lowercase(), number);
    }
    Ok(params)
}
