//! Normalizes a decoded incident collection into [`PointRecord`] values.
//!
//! Accepts `{ "incidents": [...] }`, a bare top-level array, or a `GeoJSON`
//! `FeatureCollection` of point features. Timestamps are carried through as
//! raw strings; parsing them is part of period classification.

use safety_trends_incident_models::{IncidentFieldMapping, Location, PointRecord};
use safety_trends_ingest_models::{Parsed, SkipReason};
use serde_json::Value;

use crate::IngestError;

/// Normalizes every record of an incident collection.
///
/// A record whose coordinates are missing or unparseable is kept with
/// `location: None`; only entries that are not JSON objects are skipped.
///
/// # Errors
///
/// Returns [`IngestError::MalformedInput`] if the collection has neither
/// an `incidents` nor a `features` array and is not itself an array.
pub fn parse_incidents(
    collection: &Value,
    fields: &IncidentFieldMapping,
) -> Result<Parsed<PointRecord>, IngestError> {
    let (entries, as_features) = if let Some(entries) = collection.as_array() {
        (entries, false)
    } else if let Some(entries) = collection.get("incidents").and_then(Value::as_array) {
        (entries, false)
    } else if let Some(entries) = collection.get("features").and_then(Value::as_array) {
        (entries, true)
    } else {
        return Err(IngestError::MalformedInput {
            dataset: "incident",
            message: "expected an `incidents` or `features` array".to_string(),
        });
    };

    let parsed: Parsed<PointRecord> = entries
        .iter()
        .map(|entry| {
            if as_features {
                normalize_feature(entry, fields)
            } else {
                normalize_row(entry, fields)
            }
        })
        .collect();

    log::info!(
        "Normalized {} incident records ({} skipped)",
        parsed.records.len(),
        parsed.total_skipped()
    );

    Ok(parsed)
}

fn normalize_row(row: &Value, fields: &IncidentFieldMapping) -> Result<PointRecord, SkipReason> {
    if !row.is_object() {
        return Err(SkipReason::MalformedRecord);
    }

    let location = parse_coordinate(row.get(&fields.latitude))
        .zip(parse_coordinate(row.get(&fields.longitude)))
        .and_then(|(lat, lng)| Location::new(lat, lng));

    Ok(record(location, row, fields))
}

fn normalize_feature(
    feature: &Value,
    fields: &IncidentFieldMapping,
) -> Result<PointRecord, SkipReason> {
    let props = feature
        .get("properties")
        .filter(|p| p.is_object())
        .ok_or(SkipReason::MalformedRecord)?;

    let location = feature
        .get("geometry")
        .and_then(|g| g.get("coordinates"))
        .and_then(Value::as_array)
        .filter(|coords| coords.len() == 2)
        .and_then(|coords| {
            let lng = parse_coordinate(coords.first())?;
            let lat = parse_coordinate(coords.get(1))?;
            Location::new(lat, lng)
        });

    Ok(record(location, props, fields))
}

fn record(location: Option<Location>, props: &Value, fields: &IncidentFieldMapping) -> PointRecord {
    let occurred_at = match props.get(&fields.timestamp) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let category = props
        .get(&fields.category)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    PointRecord {
        location,
        occurred_at,
        category,
    }
}

/// Parses a coordinate from a JSON number or numeric string.
fn parse_coordinate(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
