//! Deterministic archive paths for exported assets
//!
//! ```text
//! svg:     <group>/<name>.svg
//! raster:  <group>/<density folder>/<name>.<ext>
//! ```
//!
//! `<group>` is the node's base size when grouping is enabled and the base
//! size is positive, otherwise [`UNSORTED_FOLDER`].

use super::{FALLBACK_NAME, UNSORTED_FOLDER};
use crate::models::{Density, ExportFormat};

/// Normalize a node name into a file stem.
///
/// Lowercases, collapses whitespace runs into a single `_`, then drops every
/// character outside `[a-z0-9_-]`. An empty result becomes `asset`.
pub fn sanitize_name(name: &str) -> String {
    let lowered = name.to_lowercase();

    let mut collapsed = String::with_capacity(lowered.len());
    let mut in_whitespace = false;
    for c in lowered.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push('_');
            }
            in_whitespace = true;
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }

    let sanitized: String = collapsed
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect();

    if sanitized.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        sanitized
    }
}

/// Top-level folder for a node
pub fn group_folder(base_size: u32, group_by_size: bool) -> String {
    if group_by_size && base_size > 0 {
        base_size.to_string()
    } else {
        UNSORTED_FOLDER.to_string()
    }
}

pub fn svg_path(name: &str, base_size: u32, group_by_size: bool) -> String {
    format!(
        "{}/{}.{}",
        group_folder(base_size, group_by_size),
        sanitize_name(name),
        ExportFormat::Svg.extension()
    )
}

pub fn raster_path(
    name: &str,
    base_size: u32,
    group_by_size: bool,
    density: Density,
    format: ExportFormat,
) -> String {
    format!(
        "{}/{}/{}.{}",
        group_folder(base_size, group_by_size),
        density.folder(),
        sanitize_name(name),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_examples() {
        assert_eq!(sanitize_name("Icon One"), "icon_one");
        assert_eq!(sanitize_name("  Arrow\t\tLeft  "), "_arrow_left_");
        assert_eq!(sanitize_name("ic_24/Close-Outline"), "ic_24close-outline");
        assert_eq!(sanitize_name("Иконка"), "asset");
        assert_eq!(sanitize_name(""), "asset");
        assert_eq!(sanitize_name("!!!"), "asset");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let samples = [
            "",
            "Icon One",
            "  multiple   spaces ",
            "UPPER lower 123",
            "emoji 🎉 name",
            "tabs\tand\nnewlines",
            "dots.and/slashes",
            "already_clean-name",
            "Ünïcödé Nämé",
            "asset",
        ];
        for sample in samples {
            let once = sanitize_name(sample);
            assert_eq!(sanitize_name(&once), once, "input: {:?}", sample);
        }
    }

    #[test]
    fn test_grouping_moves_to_unsorted() {
        let grouped = raster_path("Home", 24, true, Density::Hdpi, ExportFormat::Png);
        let flat = raster_path("Home", 24, false, Density::Hdpi, ExportFormat::Png);
        assert_eq!(grouped, "24/drawable-hdpi/home.png");
        assert_eq!(flat, "Unsorted/drawable-hdpi/home.png");

        assert_eq!(svg_path("Home", 0, true), "Unsorted/home.svg");
        assert_eq!(svg_path("Home", 16, true), "16/home.svg");
    }

    #[test]
    fn test_paths_are_deterministic() {
        for density in Density::ALL {
            let a = raster_path("Same", 32, true, density, ExportFormat::Jpg);
            let b = raster_path("Same", 32, true, density, ExportFormat::Jpg);
            assert_eq!(a, b);
            assert!(a.ends_with("/same.jpg"));
        }
    }
}
