//! Filter registry: `(backend, filter kind) → transform + parameters`.
//!
//! Each backend builds one [`FilterRegistry`] at startup (a `LazyLock`
//! static) and looks filters up by [`FilterKind`]. A registry entry carries
//! the transform function and the [`ParamSpec`]s it understands. Callers
//! pass a raw [`FilterParams`] map; [`FilterRegistry::resolve`] merges it
//! over the defaults and rejects unknown names and out-of-range values
//! before the transform ever runs.
//!
//! The `custom` kind means something different in every backend and is not
//! meant to be portable.

use super::backend::FilterError;
use super::params::{BackendKind, FilterKind, FilterParams};
use log::debug;
use std::collections::BTreeMap;

/// One tunable parameter of a filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f64,
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
    pub description: &'static str,
}

/// A transform from one handle to a new one.
pub type Transform<H> = fn(&H, &ResolvedParams) -> H;

pub struct FilterEntry<H> {
    pub kind: FilterKind,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    transform: Transform<H>,
}

/// Parameters after merging caller values over defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedParams {
    values: BTreeMap<&'static str, f64>,
    defaulted: Vec<&'static str>,
}

impl ResolvedParams {
    /// Value of a registered parameter. Names are fixed by the registry, so
    /// an unregistered name reads as `0.0`.
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or_default()
    }

    /// Names that were absent from the caller's map and took their default.
    pub fn defaulted(&self) -> &[&'static str] {
        &self.defaulted
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }
}

/// Result of a successful filter application.
#[derive(Debug, Clone)]
pub struct Applied<H> {
    pub image: H,
    pub params: ResolvedParams,
}

/// Registry of filters for one backend.
pub struct FilterRegistry<H> {
    backend: BackendKind,
    entries: BTreeMap<FilterKind, FilterEntry<H>>,
}

impl<H> FilterRegistry<H> {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            entries: BTreeMap::new(),
        }
    }

    /// Register (or replace) the transform for `kind`.
    pub fn register(
        &mut self,
        kind: FilterKind,
        description: &'static str,
        params: &'static [ParamSpec],
        transform: Transform<H>,
    ) {
        self.entries.insert(
            kind,
            FilterEntry {
                kind,
                description,
                params,
                transform,
            },
        );
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn entry(&self, kind: FilterKind) -> Result<&FilterEntry<H>, FilterError> {
        self.entries.get(&kind).ok_or(FilterError::NotRegistered {
            backend: self.backend,
            kind,
        })
    }

    /// Entries in [`FilterKind`] order.
    pub fn entries(&self) -> impl Iterator<Item = &FilterEntry<H>> {
        self.entries.values()
    }

    /// Merge `raw` over the defaults for `kind`, validating every value.
    pub fn resolve(
        &self,
        kind: FilterKind,
        raw: &FilterParams,
    ) -> Result<ResolvedParams, FilterError> {
        let entry = self.entry(kind)?;

        if let Some(unknown) = raw
            .keys()
            .find(|name| !entry.params.iter().any(|p| p.name == name.as_str()))
        {
            return Err(FilterError::UnknownParameter {
                kind,
                name: unknown.clone(),
                known: known_names(entry.params),
            });
        }

        let mut resolved = ResolvedParams::default();
        for spec in entry.params {
            let value = match raw.get(spec.name) {
                Some(&value) => value,
                None => {
                    resolved.defaulted.push(spec.name);
                    spec.default
                }
            };
            if !(spec.min..=spec.max).contains(&value) {
                return Err(FilterError::OutOfRange {
                    kind,
                    name: spec.name,
                    value,
                    min: spec.min,
                    max: spec.max,
                });
            }
            resolved.values.insert(spec.name, value);
        }
        Ok(resolved)
    }

    /// Resolve parameters and run the transform for `kind`.
    pub fn apply(
        &self,
        image: &H,
        kind: FilterKind,
        raw: &FilterParams,
    ) -> Result<Applied<H>, FilterError> {
        let params = self.resolve(kind, raw)?;
        let entry = self.entry(kind)?;
        debug!(
            "{} filter '{}' with {:?} (defaulted: {:?})",
            self.backend,
            kind,
            params.values,
            params.defaulted()
        );
        Ok(Applied {
            image: (entry.transform)(image, &params),
            params,
        })
    }
}

fn known_names(params: &[ParamSpec]) -> String {
    if params.is_empty() {
        "none".to_string()
    } else {
        params
            .iter()
            .map(|p| p.name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}
