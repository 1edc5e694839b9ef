//! Export request models
//!
//! An [`ExportRequest`] is a transient value object describing what the user
//! asked the controller to export. Raster formats need at least one
//! [`Density`]; SVG never does.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::{ValidationError, ValidationResult};

/// Default JPEG quality when the request does not carry one
pub const DEFAULT_JPEG_QUALITY: f32 = 0.9;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Svg,
    Png,
    Jpg,
}

/// Raster density tier, mirroring mobile resource qualifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Density {
    Mdpi,
    Hdpi,
    Xhdpi,
    Xxhdpi,
    Xxxhdpi,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Svg, ExportFormat::Png, ExportFormat::Jpg];

    /// File extension, also the wire identifier
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Svg => "svg",
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
        }
    }

    pub fn is_raster(&self) -> bool {
        !matches!(self, ExportFormat::Svg)
    }
}

impl Density {
    pub const ALL: [Density; 5] = [
        Density::Mdpi,
        Density::Hdpi,
        Density::Xhdpi,
        Density::Xxhdpi,
        Density::Xxxhdpi,
    ];

    /// Uniform scale factor applied when rasterizing
    pub fn scale(&self) -> f32 {
        match self {
            Density::Mdpi => 1.0,
            Density::Hdpi => 1.5,
            Density::Xhdpi => 2.0,
            Density::Xxhdpi => 3.0,
            Density::Xxxhdpi => 4.0,
        }
    }

    /// Archive folder holding this tier's files
    pub fn folder(&self) -> &'static str {
        match self {
            Density::Mdpi => "drawable-mdpi",
            Density::Hdpi => "drawable-hdpi",
            Density::Xhdpi => "drawable-xhdpi",
            Density::Xxhdpi => "drawable-xxhdpi",
            Density::Xxxhdpi => "drawable-xxxhdpi",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Density::Mdpi => "mdpi",
            Density::Hdpi => "hdpi",
            Density::Xhdpi => "xhdpi",
            Density::Xxhdpi => "xxhdpi",
            Density::Xxxhdpi => "xxxhdpi",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to export and how to package it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub format: ExportFormat,

    /// Density tiers for raster formats; ignored for SVG. `null` reads as empty.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub densities: Vec<Density>,

    /// Bucket assets into folders named after their base size
    #[serde(default, deserialize_with = "null_as_default")]
    pub group_by_size: bool,

    /// JPEG quality in `[0, 1]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f32>,

    /// Overrides the default archive name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_name: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ExportRequest {
    pub fn svg(group_by_size: bool) -> Self {
        Self {
            format: ExportFormat::Svg,
            densities: Vec::new(),
            group_by_size,
            quality: None,
            zip_name: None,
        }
    }

    pub fn raster(format: ExportFormat, densities: Vec<Density>, group_by_size: bool) -> Self {
        Self {
            format,
            densities,
            group_by_size,
            quality: None,
            zip_name: None,
        }
    }

    /// Check the request before any export work begins
    pub fn validate(&self) -> ValidationResult<()> {
        if self.format.is_raster() && self.densities.is_empty() {
            return Err(ValidationError::MissingDensities);
        }

        if let Some(quality) = self.quality {
            if !(0.0..=1.0).contains(&quality) {
                return Err(ValidationError::QualityOutOfRange { quality });
            }
        }

        Ok(())
    }

    /// Requested densities in request order, without repeats
    pub fn unique_densities(&self) -> Vec<Density> {
        let mut seen = Vec::with_capacity(self.densities.len());
        for density in &self.densities {
            if !seen.contains(density) {
                seen.push(*density);
            }
        }
        seen
    }

    /// Quality to hand to the JPEG encoder, if the format uses one
    pub fn jpeg_quality(&self, default: f32) -> Option<f32> {
        match self.format {
            ExportFormat::Jpg => Some(self.quality.unwrap_or(default)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_density_table() {
        let scales: Vec<f32> = Density::ALL.iter().map(|d| d.scale()).collect();
        assert_eq!(scales, vec![1.0, 1.5, 2.0, 3.0, 4.0]);
        assert_eq!(Density::Xxxhdpi.folder(), "drawable-xxxhdpi");
    }

    #[test]
    fn test_raster_requires_densities() {
        for format in [ExportFormat::Png, ExportFormat::Jpg] {
            let request = ExportRequest::raster(format, vec![], true);
            assert_matches!(request.validate(), Err(ValidationError::MissingDensities));
        }

        assert!(ExportRequest::svg(false).validate().is_ok());
    }

    #[test]
    fn test_quality_range() {
        let mut request = ExportRequest::raster(ExportFormat::Jpg, vec![Density::Mdpi], false);
        request.quality = Some(1.5);
        assert_matches!(
            request.validate(),
            Err(ValidationError::QualityOutOfRange { .. })
        );

        request.quality = None;
        assert_eq!(request.jpeg_quality(DEFAULT_JPEG_QUALITY), Some(0.9));
        assert_eq!(
            ExportRequest::svg(true).jpeg_quality(DEFAULT_JPEG_QUALITY),
            None
        );
    }

    #[test]
    fn test_unique_densities_keeps_order() {
        let request = ExportRequest::raster(
            ExportFormat::Png,
            vec![Density::Xhdpi, Density::Mdpi, Density::Xhdpi],
            true,
        );
        assert_eq!(
            request.unique_densities(),
            vec![Density::Xhdpi, Density::Mdpi]
        );
    }

    #[test]
    fn test_wire_shape() {
        let request: ExportRequest = serde_json::from_str(
            r#"{"format":"png","densities":["mdpi","xhdpi"],"groupBySize":true}"#,
        )
        .unwrap();
        assert_eq!(request.format, ExportFormat::Png);
        assert_eq!(request.densities, vec![Density::Mdpi, Density::Xhdpi]);
        assert!(request.group_by_size);
        assert_eq!(request.zip_name, None);

        let svg: ExportRequest = serde_json::from_str(r#"{"format":"svg"}"#).unwrap();
        assert!(svg.densities.is_empty());
        assert!(!svg.group_by_size);
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let request: ExportRequest = serde_json::from_str(
            r#"{"format":"png","densities":null,"groupBySize":null,"quality":null}"#,
        )
        .unwrap();
        assert!(request.densities.is_empty());
        assert!(!request.group_by_size);
        assert_matches!(request.validate(), Err(ValidationError::MissingDensities));
    }
}
