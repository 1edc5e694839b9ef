//! Selection snapshot models

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a design node inside the host document
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Width and height of a rectangle, in document units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Geometry a node exposes for base-size computation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeGeometry {
    /// Nominal layout size
    pub nominal: Bounds,
    /// Tight visual bounds, when the host can compute them
    pub render_bounds: Option<Bounds>,
}

impl NodeGeometry {
    pub fn nominal(width: f64, height: f64) -> Self {
        Self {
            nominal: Bounds::new(width, height),
            render_bounds: None,
        }
    }

    pub fn with_render_bounds(mut self, width: f64, height: f64) -> Self {
        self.render_bounds = Some(Bounds::new(width, height));
        self
    }

    /// Rounded larger dimension, preferring the render bounds.
    ///
    /// Degenerate geometry (negative, NaN or infinite) yields 0, which sends
    /// the node to the unsorted folder.
    pub fn base_size(&self) -> u32 {
        let bounds = self.render_bounds.unwrap_or(self.nominal);
        let largest = bounds.width.max(bounds.height);
        if !largest.is_finite() || largest <= 0.0 {
            return 0;
        }
        largest.round().min(u32::MAX as f64) as u32
    }
}

/// One selected node as seen by the export pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: NodeId,
    /// Display name, possibly empty
    pub name: String,
    pub geometry: NodeGeometry,
}

impl NodeSnapshot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, geometry: NodeGeometry) -> Self {
        Self {
            id: NodeId::new(id),
            name: name.into(),
            geometry,
        }
    }

    pub fn base_size(&self) -> u32 {
        self.geometry.base_size()
    }
}
