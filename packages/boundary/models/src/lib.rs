#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Neighborhood boundary types.
//!
//! A [`Boundary`] pairs a stable identifier and display name with a
//! [`BoundaryGeometry`]. The geometry is a closed sum type with one
//! variant per supported shape; anything else decodes to
//! [`BoundaryGeometry::Unsupported`] so that callers can warn about it
//! without failing the whole dataset.

use serde::{Deserialize, Serialize};

/// A polygon vertex in floating-point degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl Vertex {
    /// Creates a vertex from a latitude/longitude pair.
    #[must_use]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// The rings of a single polygon.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PolygonRings {
    /// Outer ring.
    pub exterior: Vec<Vertex>,
    /// Holes. Kept for fidelity with the source data; containment only
    /// ever looks at the exterior ring.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interiors: Vec<Vec<Vertex>>,
}

impl PolygonRings {
    /// Creates a polygon with no holes.
    #[must_use]
    pub const fn exterior(exterior: Vec<Vertex>) -> Self {
        Self {
            exterior,
            interiors: Vec::new(),
        }
    }
}

/// Geometry of a neighborhood boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoundaryGeometry {
    /// A single polygon.
    Polygon(PolygonRings),
    /// Several disjoint polygons.
    MultiPolygon {
        /// Member polygons in stored order.
        polygons: Vec<PolygonRings>,
    },
    /// A nested collection of sub-geometries.
    GeometryCollection {
        /// Member geometries in stored order.
        geometries: Vec<Self>,
    },
    /// A geometry kind the engine does not aggregate over (points,
    /// lines, ...). Holds the source type name for diagnostics.
    Unsupported {
        /// Source geometry type name (e.g. `"LineString"`).
        kind: String,
    },
}

impl BoundaryGeometry {
    /// Returns the `GeoJSON`-style type name of this geometry.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon { .. } => "MultiPolygon",
            Self::GeometryCollection { .. } => "GeometryCollection",
            Self::Unsupported { kind } => kind,
        }
    }
}

/// A neighborhood boundary as handed to the trend engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    /// Identifier, unique within a dataset.
    pub id: String,
    /// Human-readable neighborhood name.
    pub name: String,
    /// Boundary geometry, or `None` when the source feature had none.
    pub geometry: Option<BoundaryGeometry>,
}

impl Boundary {
    /// Creates a boundary with a geometry.
    #[must_use]
    pub fn new(id: &str, name: &str, geometry: BoundaryGeometry) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            geometry: Some(geometry),
        }
    }
}

/// Axis-aligned bounding box over a boundary's extracted vertices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    /// Southern edge.
    pub min_lat: f64,
    /// Northern edge.
    pub max_lat: f64,
    /// Western edge.
    pub min_lon: f64,
    /// Eastern edge.
    pub max_lon: f64,
}

impl BoundingBox {
    /// Computes the bounding box of a vertex sequence.
    ///
    /// Returns `None` for an empty sequence or one containing non-finite
    /// coordinates.
    #[must_use]
    pub fn from_vertices(vertices: &[Vertex]) -> Option<Self> {
        let (first, rest) = vertices.split_first()?;
        let mut bbox = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lon: first.lon,
            max_lon: first.lon,
        };
        for v in rest {
            bbox.min_lat = bbox.min_lat.min(v.lat);
            bbox.max_lat = bbox.max_lat.max(v.lat);
            bbox.min_lon = bbox.min_lon.min(v.lon);
            bbox.max_lon = bbox.max_lon.max(v.lon);
        }
        bbox.is_finite().then_some(bbox)
    }

    /// Whether all four edges are finite numbers.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.min_lat.is_finite()
            && self.max_lat.is_finite()
            && self.min_lon.is_finite()
            && self.max_lon.is_finite()
    }

    /// Inclusive point containment.
    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }
}

/// Field mapping for extracting an identifier and display name from a
/// boundary feature's properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryFieldMapping {
    /// Property holding an explicit identifier. When absent on a feature
    /// the identifier falls back to a slug of the display name.
    pub id_field: Option<String>,
    /// Properties probed in order for the display name.
    pub name_fields: Vec<String>,
}

impl Default for BoundaryFieldMapping {
    fn default() -> Self {
        Self {
            id_field: Some("id".to_string()),
            name_fields: vec![
                "name".to_string(),
                "S_HOOD".to_string(),
                "L_HOOD".to_string(),
                "neighborhood".to_string(),
            ],
        }
    }
}
