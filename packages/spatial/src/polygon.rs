//! Even-odd point-in-polygon test with boundary tolerance.

use safety_trends_boundary_models::Vertex;

use crate::extract::MIN_RING_VERTICES;

/// Per-axis slack when deciding whether a point sits on an edge.
const EDGE_TOLERANCE: f64 = 1e-5;

/// Cross-product magnitude below which a point is collinear with an edge.
const COLLINEAR_EPSILON: f64 = 1e-10;

/// Whether `(lat, lon)` lies inside the ring described by `vertices`.
///
/// Edges run between consecutive vertices and wrap from the last vertex
/// back to the first. Points on an edge count as inside. Rings with fewer
/// than three vertices contain nothing. The result does not depend on
/// ring winding direction.
#[must_use]
pub fn contains(lat: f64, lon: f64, vertices: &[Vertex]) -> bool {
    if vertices.len() < MIN_RING_VERTICES {
        return false;
    }

    if edges(vertices).any(|(a, b)| on_segment(lat, lon, a, b)) {
        return true;
    }

    let mut inside = false;
    for (a, b) in edges(vertices) {
        if (a.lat > lat) != (b.lat > lat) {
            let crossing_lon = (b.lon - a.lon) * (lat - a.lat) / (b.lat - a.lat) + a.lon;
            if lon < crossing_lon {
                inside = !inside;
            }
        }
    }
    inside
}

/// Iterates `(vertices[i - 1], vertices[i])` pairs, starting with the
/// closing edge `(last, first)`.
fn edges(vertices: &[Vertex]) -> impl Iterator<Item = (&Vertex, &Vertex)> {
    let previous = vertices.iter().cycle().skip(vertices.len() - 1);
    previous.zip(vertices.iter())
}

fn on_segment(lat: f64, lon: f64, a: &Vertex, b: &Vertex) -> bool {
    let cross = (lon - a.lon) * (b.lat - a.lat) - (lat - a.lat) * (b.lon - a.lon);
    if cross.abs() > COLLINEAR_EPSILON {
        return false;
    }

    lon >= a.lon.min(b.lon) - EDGE_TOLERANCE
        && lon <= a.lon.max(b.lon) + EDGE_TOLERANCE
        && lat >= a.lat.min(b.lat) - EDGE_TOLERANCE
        && lat <= a.lat.max(b.lat) + EDGE_TOLERANCE
}
