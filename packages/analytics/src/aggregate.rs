//! Per-neighborhood trend aggregation for a single time window.
//!
//! Points are filtered by category, split into recent and previous
//! buckets, and each bucket gets its own [`GridIndex`]. Every boundary
//! then queries both indexes with its cached bounding box and confirms
//! candidates with an exact containment test.

use std::collections::{BTreeMap, BTreeSet};

use safety_trends_analytics_models::{
    CategorySelection, Period, TimeWindow, TrendDiagnostics, TrendRecord, WindowTrend,
};
use safety_trends_boundary_models::{Boundary, Vertex};
use safety_trends_incident_models::PointRecord;
use safety_trends_ingest_models::{SkipReason, record_skip};
use safety_trends_spatial::{GridIndex, MIN_RING_VERTICES, contains, extract_vertices};

use crate::TrendError;
use crate::cache::ResultCache;
use crate::classify::{ReferenceTime, classify_record, is_category_selected};

/// Points that passed the category filter, split by period.
#[derive(Debug, Default)]
pub struct PartitionedPoints<'a> {
    /// Recent-period points, in input order.
    pub recent: Vec<&'a PointRecord>,
    /// Previous-period points, in input order.
    pub previous: Vec<&'a PointRecord>,
}

/// Rounded percent change from `previous` to `recent`.
///
/// Capped at +100 with no matching floor, and 0 whenever `previous` is 0.
/// Rounds half away from zero.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn change_percent(recent: u64, previous: u64) -> i64 {
    if previous == 0 {
        return 0;
    }
    let change = (recent as f64 - previous as f64) / previous as f64 * 100.0;
    change.min(100.0).round() as i64
}

/// Filters `points` by `selection` and buckets them by period, tallying
/// every point that cannot be bucketed into `diagnostics`.
pub fn partition_points<'a>(
    points: &'a [PointRecord],
    window: TimeWindow,
    selection: &CategorySelection,
    reference: &ReferenceTime,
    diagnostics: &mut TrendDiagnostics,
) -> PartitionedPoints<'a> {
    let mut partitioned = PartitionedPoints::default();

    for point in points {
        diagnostics.total_points += 1;

        if !is_category_selected(point, selection) {
            diagnostics.filtered_points += 1;
            continue;
        }

        match classify_record(point, window, reference) {
            Ok(Period::Recent) => {
                diagnostics.recent_points += 1;
                partitioned.recent.push(point);
            }
            Ok(Period::Previous) => {
                diagnostics.previous_points += 1;
                partitioned.previous.push(point);
            }
            Ok(Period::Other) => diagnostics.other_points += 1,
            Err(reason) => record_skip(&mut diagnostics.skipped_points, reason),
        }
    }

    partitioned
}

/// Computes one fresh [`TrendRecord`] per boundary for `window`.
///
/// Each record holds only `window`'s sub-record; merging with earlier
/// windows is the caller's job. Boundaries without geometry, with an
/// unboundable geometry, or repeating an earlier identifier are skipped
/// and tallied. Degenerate boundaries (fewer than three vertices) yield a
/// zero-count record.
///
/// # Errors
///
/// Returns [`TrendError::Spatial`] if `grid_size` is unusable.
pub fn aggregate_window(
    boundaries: &[Boundary],
    points: &[PointRecord],
    window: TimeWindow,
    selection: &CategorySelection,
    reference: &ReferenceTime,
    grid_size: f64,
    cache: &mut ResultCache,
) -> Result<(BTreeMap<String, TrendRecord>, TrendDiagnostics), TrendError> {
    let mut diagnostics = TrendDiagnostics::default();

    let partitioned = partition_points(points, window, selection, reference, &mut diagnostics);
    let recent_index = GridIndex::build(partitioned.recent.iter().copied(), grid_size)?;
    let previous_index = GridIndex::build(partitioned.previous.iter().copied(), grid_size)?;

    log::debug!(
        "Indexed {} recent points in {} cells and {} previous points in {} cells",
        recent_index.len(),
        recent_index.cell_count(),
        previous_index.len(),
        previous_index.cell_count()
    );

    let mut trends = BTreeMap::new();
    let mut seen = BTreeSet::new();

    for boundary in boundaries {
        if !seen.insert(boundary.id.as_str()) {
            log::warn!("Skipping duplicate neighborhood id {}", boundary.id);
            record_skip(&mut diagnostics.skipped_boundaries, SkipReason::DuplicateBoundary);
            continue;
        }

        let Some(geometry) = &boundary.geometry else {
            log::warn!("Skipping neighborhood {} with no geometry", boundary.id);
            record_skip(&mut diagnostics.skipped_boundaries, SkipReason::MissingGeometry);
            continue;
        };

        let vertices = extract_vertices(geometry);
        if vertices.len() < MIN_RING_VERTICES {
            log::debug!(
                "Neighborhood {} is degenerate ({} vertices); reporting zero counts",
                boundary.id,
                vertices.len()
            );
            diagnostics.degenerate_boundaries += 1;
            diagnostics.boundaries_processed += 1;
            trends.insert(
                boundary.id.clone(),
                TrendRecord::empty(&boundary.id, &boundary.name, window),
            );
            continue;
        }

        let Some(bbox) = cache.bounds_or_compute(&boundary.id, &vertices) else {
            log::warn!("Skipping neighborhood {} with unboundable geometry", boundary.id);
            record_skip(&mut diagnostics.skipped_boundaries, SkipReason::InvalidGeometry);
            continue;
        };

        let recent: Vec<&PointRecord> = recent_index
            .query(&bbox)
            .into_iter()
            .filter(|point| is_inside(point, &vertices))
            .collect();
        let previous_count = previous_index
            .query(&bbox)
            .into_iter()
            .filter(|point| is_inside(point, &vertices))
            .count() as u64;
        let recent_count = recent.len() as u64;

        let mut categories: BTreeMap<String, u64> = BTreeMap::new();
        for point in &recent {
            *categories.entry(point.category.clone()).or_default() += 1;
        }

        let trend = WindowTrend {
            recent_count,
            previous_count,
            change_percent: change_percent(recent_count, previous_count),
            categories,
        };

        log::debug!(
            "{} ({}): recent={} previous={} change={}%",
            boundary.name,
            boundary.id,
            trend.recent_count,
            trend.previous_count,
            trend.change_percent
        );

        diagnostics.boundaries_processed += 1;
        trends.insert(
            boundary.id.clone(),
            TrendRecord::new(&boundary.id, &boundary.name, window, trend),
        );
    }

    Ok((trends, diagnostics))
}

fn is_inside(point: &PointRecord, vertices: &[Vertex]) -> bool {
    point
        .location
        .is_some_and(|loc| contains(loc.latitude, loc.longitude, vertices))
}

/// Folds a freshly computed record into the record previously held for
/// the same neighborhood.
///
/// The fresh window's results replace the top-level counts and that
/// window's sub-record; sub-records of other windows carry over.
#[must_use]
pub fn merge_window(prior: Option<&TrendRecord>, mut fresh: TrendRecord) -> TrendRecord {
    if let Some(prior) = prior {
        for (window, trend) in &prior.windows {
            fresh
                .windows
                .entry(*window)
                .or_insert_with(|| trend.clone());
        }
    }
    fresh
}

/// Projects every record onto `window`'s sub-record.
///
/// Top-level counts and categories come from the sub-record and the
/// percent change is recomputed from its counts. Records with no
/// sub-record for `window` project to zero counts. Sub-records are left
/// untouched.
#[must_use]
pub fn trends_for_window(
    all: &BTreeMap<String, TrendRecord>,
    window: TimeWindow,
) -> BTreeMap<String, TrendRecord> {
    all.iter()
        .map(|(id, record)| {
            let trend = record.window_trend(window).cloned().unwrap_or_default();
            let projected = TrendRecord {
                window,
                recent_count: trend.recent_count,
                previous_count: trend.previous_count,
                change_percent: change_percent(trend.recent_count, trend.previous_count),
                categories: trend.categories,
                ..record.clone()
            };
            (id.clone(), projected)
        })
        .collect()
}
