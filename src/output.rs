//! CLI output formatting for the interactive session and subcommands.
//!
//! # Output Format
//!
//! ## Menu
//!
//! ```text
//! Actions
//!     [s]how    display the current image
//!     [w]rite   save to a path
//!     ...
//! ```
//!
//! ## Info
//!
//! ```text
//! photo.jpg
//!     Backend: raster
//!     Size: 1920x1080
//!     Channels: 3
//!     Format: jpg
//! ```
//!
//! ## Filter catalog
//!
//! ```text
//! Filters (array backend)
//! blur      gaussian blur
//!     sigma = 2 (0.1..=20)  standard deviation in pixels
//! sharpen   unsharp mask
//!     ...
//! ```
//!
//! # Architecture
//!
//! Each display has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::imaging::{FilterKind, FilterRegistry, ResolvedParams};
use crate::service::ImageInfo;
use std::io::{self, Write};
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Session actions: key, long name, help text.
pub const ACTIONS: &[(&str, &str, &str)] = &[
    ("s", "show", "display the current image"),
    ("w", "write", "save to a path"),
    ("r", "resize", "crop and scale to an exact size"),
    ("f", "filter", "apply blur, sharpen, smooth or custom"),
    ("i", "info", "print dimensions and format"),
    ("l", "load", "replace the image with a new source"),
    ("q", "quit", "leave the session"),
];

// ============================================================================
// Menu and info
// ============================================================================

pub fn format_menu() -> Vec<String> {
    let mut lines = vec!["Actions".to_string()];
    for (key, name, help) in ACTIONS {
        let label = format!("[{}]{}", key, &name[key.len()..]);
        lines.push(format!("{}{:<9} {}", indent(1), label, help));
    }
    lines
}

/// Format the current image's identity and properties.
pub fn format_info(source: &str, info: &ImageInfo) -> Vec<String> {
    let format = info
        .format
        .and_then(|f| f.extensions_str().first().copied())
        .unwrap_or("unknown");
    vec![
        source.to_string(),
        format!("{}Backend: {}", indent(1), info.backend),
        format!("{}Size: {}x{}", indent(1), info.width, info.height),
        format!("{}Channels: {}", indent(1), info.channels),
        format!("{}Format: {}", indent(1), format),
    ]
}

// ============================================================================
// Filters
// ============================================================================

/// Format a number without a trailing `.0` for whole values.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Format every registered filter with its parameters, defaults and ranges.
pub fn format_filter_catalog<H>(registry: &FilterRegistry<H>) -> Vec<String> {
    let mut lines = vec![format!("Filters ({} backend)", registry.backend())];
    for entry in registry.entries() {
        lines.push(format!("{:<9} {}", entry.kind.name(), entry.description));
        if entry.params.is_empty() {
            lines.push(format!("{}(no parameters)", indent(1)));
        }
        for spec in entry.params {
            lines.push(format!(
                "{}{} = {} ({}..={})  {}",
                indent(1),
                spec.name,
                format_number(spec.default),
                format_number(spec.min),
                format_number(spec.max),
                spec.description
            ));
        }
    }
    lines
}

/// Format the outcome of a filter, flagging every value that came from a
/// default so the caller is never silently given one.
pub fn format_applied(kind: FilterKind, params: &ResolvedParams) -> Vec<String> {
    let mut lines = vec![format!("Applied {}", kind)];
    for (name, value) in params.iter() {
        let note = if params.defaulted().contains(&name) {
            " (default)"
        } else {
            ""
        };
        lines.push(format!(
            "{}{} = {}{}",
            indent(1),
            name,
            format_number(value),
            note
        ));
    }
    lines
}

pub fn format_saved(path: &Path) -> String {
    format!("Saved → {}", path.display())
}

// ============================================================================
// Writers
// ============================================================================

/// Write lines to any sink; the session uses this with its own output.
pub fn write_lines<W: Write>(out: &mut W, lines: &[String]) -> io::Result<()> {
    for line in lines {
        writeln!(out, "{}", line)?;
    }
    Ok(())
}

pub fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

pub fn print_filter_catalog<H>(registry: &FilterRegistry<H>) {
    print_lines(&format_filter_catalog(registry));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{BackendKind, FilterParams, ParamSpec};
    use image::ImageFormat;

    static STRENGTH: [ParamSpec; 1] = [ParamSpec {
        name: "strength",
        default: 2.0,
        min: 0.0,
        max: 10.5,
        description: "how much",
    }];

    fn registry() -> FilterRegistry<u8> {
        let mut registry = FilterRegistry::new(BackendKind::Array);
        registry.register(FilterKind::Blur, "soften", &STRENGTH, |v, _| *v);
        registry.register(FilterKind::Smooth, "flatten", &[], |v, _| *v);
        registry
    }

    #[test]
    fn menu_lists_every_action() {
        let lines = format_menu();
        assert_eq!(lines[0], "Actions");
        assert_eq!(lines.len(), ACTIONS.len() + 1);
        assert!(lines[1].starts_with("    [s]how"));
        assert!(lines.last().unwrap().contains("[q]uit"));
    }

    #[test]
    fn info_shows_format_extension() {
        let info = ImageInfo {
            backend: BackendKind::Raster,
            width: 640,
            height: 480,
            channels: 3,
            format: Some(ImageFormat::Jpeg),
        };
        let lines = format_info("photo.jpg", &info);
        assert_eq!(
            lines,
            vec![
                "photo.jpg",
                "    Backend: raster",
                "    Size: 640x480",
                "    Channels: 3",
                "    Format: jpg",
            ]
        );
    }

    #[test]
    fn info_without_format() {
        let info = ImageInfo {
            backend: BackendKind::Array,
            width: 1,
            height: 1,
            channels: 4,
            format: None,
        };
        assert_eq!(format_info("x", &info)[4], "    Format: unknown");
    }

    #[test]
    fn catalog_lists_params_in_kind_order() {
        let lines = format_filter_catalog(&registry());
        assert_eq!(lines[0], "Filters (array backend)");
        assert_eq!(lines[1], "blur      soften");
        assert_eq!(lines[2], "    strength = 2 (0..=10.5)  how much");
        assert_eq!(lines[3], "smooth    flatten");
        assert_eq!(lines[4], "    (no parameters)");
    }

    #[test]
    fn applied_marks_defaults() {
        let registry = registry();
        let defaulted = registry.resolve(FilterKind::Blur, &FilterParams::new()).unwrap();
        assert_eq!(
            format_applied(FilterKind::Blur, &defaulted),
            vec!["Applied blur", "    strength = 2 (default)"]
        );

        let mut raw = FilterParams::new();
        raw.insert("strength".into(), 0.5);
        let explicit = registry.resolve(FilterKind::Blur, &raw).unwrap();
        assert_eq!(format_applied(FilterKind::Blur, &explicit)[1], "    strength = 0.5");
    }

    #[test]
    fn saved_line() {
        assert_eq!(format_saved(Path::new("out/a.png")), "Saved → out/a.png");
    }
}
