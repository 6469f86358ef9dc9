//! Normalizes a `GeoJSON` `FeatureCollection` into [`Boundary`] values.
//!
//! Uses the [`BoundaryFieldMapping`] to find each feature's identifier and
//! display name regardless of the source's property naming, then decodes
//! the geometry through `geo` types into the engine's [`BoundaryGeometry`].

use std::collections::BTreeSet;

use safety_trends_boundary_models::{
    Boundary, BoundaryFieldMapping, BoundaryGeometry, PolygonRings, Vertex,
};
use safety_trends_ingest_models::{Parsed, SkipReason};
use serde_json::Value;

use crate::IngestError;

/// Normalizes every feature of a neighborhood `FeatureCollection`.
///
/// Identifiers are made unique within the batch by suffixing `-2`, `-3`,
/// and so on. Features with a null geometry are kept with
/// `geometry: None`; features whose geometry cannot be decoded are
/// skipped as [`SkipReason::InvalidGeometry`].
///
/// # Errors
///
/// Returns [`IngestError::MalformedInput`] if the collection has no
/// `features` array.
pub fn parse_neighborhoods(
    collection: &Value,
    fields: &BoundaryFieldMapping,
) -> Result<Parsed<Boundary>, IngestError> {
    let features = collection
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError::MalformedInput {
            dataset: "neighborhood",
            message: "expected a `features` array".to_string(),
        })?;

    let mut seen = BTreeSet::new();
    let parsed: Parsed<Boundary> = features
        .iter()
        .enumerate()
        .map(|(index, feature)| {
            let mut boundary = normalize_feature(index, feature, fields)?;
            boundary.id = unique_id(&boundary.id, &mut seen);
            Ok(boundary)
        })
        .collect();

    log::info!(
        "Normalized {} neighborhood boundaries ({} skipped)",
        parsed.records.len(),
        parsed.total_skipped()
    );

    Ok(parsed)
}

fn normalize_feature(
    index: usize,
    feature: &Value,
    fields: &BoundaryFieldMapping,
) -> Result<Boundary, SkipReason> {
    if !feature.is_object() {
        return Err(SkipReason::MalformedRecord);
    }
    let props = feature.get("properties").filter(|p| p.is_object());

    let name = props
        .and_then(|props| {
            fields.name_fields.iter().find_map(|field| {
                props
                    .get(field)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
        })
        .map_or_else(|| format!("Neighborhood {}", index + 1), str::to_string);

    let explicit_id = fields
        .id_field
        .as_ref()
        .and_then(|field| props?.get(field))
        .and_then(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

    let id = explicit_id.unwrap_or_else(|| {
        let slug = slugify(&name);
        if slug.is_empty() {
            format!("neighborhood-{}", index + 1)
        } else {
            slug
        }
    });

    let geometry = match feature.get("geometry") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(decode_geometry(raw).ok_or_else(|| {
            log::warn!("Failed to decode geometry for neighborhood {name}");
            SkipReason::InvalidGeometry
        })?),
    };

    Ok(Boundary { id, name, geometry })
}

/// Appends `-2`, `-3`, ... until `id` is unused, then marks it used.
fn unique_id(id: &str, seen: &mut BTreeSet<String>) -> String {
    let mut candidate = id.to_string();
    let mut suffix = 2;
    while seen.contains(&candidate) {
        candidate = format!("{id}-{suffix}");
        suffix += 1;
    }
    if candidate != id {
        log::debug!("Duplicate neighborhood id {id}; renamed to {candidate}");
    }
    seen.insert(candidate.clone());
    candidate
}

/// Lowercases ASCII alphanumerics and collapses everything else into
/// single hyphens (e.g. `"Capitol Hill / Eastlake"` -> `"capitol-hill-eastlake"`).
#[must_use]
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn decode_geometry(raw: &Value) -> Option<BoundaryGeometry> {
    let geometry: geojson::Geometry = serde_json::from_value(raw.clone()).ok()?;
    let geometry: geo::Geometry<f64> = geometry.try_into().ok()?;
    Some(from_geo(geometry))
}

fn from_geo(geometry: geo::Geometry<f64>) -> BoundaryGeometry {
    match geometry {
        geo::Geometry::Polygon(polygon) => BoundaryGeometry::Polygon(polygon_rings(&polygon)),
        geo::Geometry::MultiPolygon(multi) => BoundaryGeometry::MultiPolygon {
            polygons: multi.0.iter().map(polygon_rings).collect(),
        },
        geo::Geometry::GeometryCollection(collection) => BoundaryGeometry::GeometryCollection {
            geometries: collection.0.into_iter().map(from_geo).collect(),
        },
        other => BoundaryGeometry::Unsupported {
            kind: geo_kind(&other).to_string(),
        },
    }
}

fn polygon_rings(polygon: &geo::Polygon<f64>) -> PolygonRings {
    PolygonRings {
        exterior: ring_vertices(polygon.exterior()),
        interiors: polygon.interiors().iter().map(ring_vertices).collect(),
    }
}

fn ring_vertices(ring: &geo::LineString<f64>) -> Vec<Vertex> {
    ring.coords().map(|c| Vertex::new(c.y, c.x)).collect()
}

const fn geo_kind(geometry: &geo::Geometry<f64>) -> &'static str {
    match geometry {
        geo::Geometry::Point(_) => "Point",
        geo::Geometry::MultiPoint(_) => "MultiPoint",
        geo::Geometry::Line(_) | geo::Geometry::LineString(_) => "LineString",
        geo::Geometry::MultiLineString(_) => "MultiLineString",
        _ => "Geometry",
    }
}
