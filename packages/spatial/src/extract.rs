//! Flattens a [`BoundaryGeometry`] into the vertex sequence used for
//! containment testing.

use safety_trends_boundary_models::{BoundaryGeometry, Vertex};

/// Minimum number of vertices for a boundary to enclose any area.
pub const MIN_RING_VERTICES: usize = 3;

/// Extracts the outer-ring vertices of a boundary geometry.
///
/// Polygons contribute their exterior ring, multi-polygons each member's
/// exterior ring in stored order, and collections the concatenation of
/// their members (recursively). Holes are never extracted. Unsupported
/// geometry kinds log a warning and contribute nothing.
///
/// A result shorter than [`MIN_RING_VERTICES`] is a degenerate boundary;
/// callers treat it as having no footprint.
#[must_use]
pub fn extract_vertices(geometry: &BoundaryGeometry) -> Vec<Vertex> {
    let mut out = Vec::new();
    extract_into(geometry, &mut out);
    out
}

fn extract_into(geometry: &BoundaryGeometry, out: &mut Vec<Vertex>) {
    match geometry {
        BoundaryGeometry::Polygon(polygon) => out.extend_from_slice(&polygon.exterior),
        BoundaryGeometry::MultiPolygon { polygons } => {
            for polygon in polygons {
                out.extend_from_slice(&polygon.exterior);
            }
        }
        BoundaryGeometry::GeometryCollection { geometries } => {
            for member in geometries {
                extract_into(member, out);
            }
        }
        BoundaryGeometry::Unsupported { kind } => {
            log::warn!("Unsupported boundary geometry type {kind}; no vertices extracted");
        }
    }
}
