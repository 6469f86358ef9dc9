//! The stateful entry point that owns configuration, cache and the
//! diagnostics of the most recent computation.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use safety_trends_analytics_models::{
    CategorySelection, TimeWindow, TrendDiagnostics, TrendRecord,
};
use safety_trends_boundary_models::{Boundary, BoundaryFieldMapping};
use safety_trends_incident_models::{IncidentFieldMapping, PointRecord};
use safety_trends_ingest::{parse_incidents, parse_neighborhoods};
use safety_trends_ingest_models::SkipCounts;
use serde_json::Value;

use crate::TrendError;
use crate::aggregate::{aggregate_window, merge_window, trends_for_window};
use crate::cache::ResultCache;
use crate::classify::ReferenceTime;
use crate::config::EngineConfig;

/// Computes neighborhood trends and remembers results across windows.
#[derive(Debug)]
pub struct TrendEngine {
    config: EngineConfig,
    cache: ResultCache,
    diagnostics: TrendDiagnostics,
    now: Option<DateTime<Utc>>,
}

impl TrendEngine {
    /// Creates an engine with an empty cache.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::Config`] if `config` fails validation.
    pub fn new(config: EngineConfig) -> Result<Self, TrendError> {
        config.validate()?;
        Ok(Self {
            config,
            cache: ResultCache::new(),
            diagnostics: TrendDiagnostics::default(),
            now: None,
        })
    }

    /// Pins the rolling-window anchor instead of reading the clock.
    #[must_use]
    pub const fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    /// Pins (or with `None`, unpins) the rolling-window anchor.
    pub fn pin_now(&mut self, now: Option<DateTime<Utc>>) {
        self.now = now;
    }

    /// Validated tunables this engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reference time used by [`Self::compute_trends`].
    #[must_use]
    pub fn reference_time(&self) -> ReferenceTime {
        self.now.map_or_else(
            || ReferenceTime::current(self.config.analysis_year),
            |now| ReferenceTime::new(now, self.config.analysis_year),
        )
    }

    /// Computes trends for `window` against the engine's reference time.
    ///
    /// # Errors
    ///
    /// See [`Self::compute_trends_at`].
    pub fn compute_trends(
        &mut self,
        boundaries: &[Boundary],
        points: &[PointRecord],
        window: TimeWindow,
        selection: &CategorySelection,
    ) -> Result<BTreeMap<String, TrendRecord>, TrendError> {
        let reference = self.reference_time();
        self.compute_trends_at(boundaries, points, window, selection, reference)
    }

    /// Computes trends for `window`, merges them into the previous call's
    /// results and caches the merged mapping.
    ///
    /// The returned mapping holds one record per boundary in this call.
    /// Each record's top-level fields describe `window`; sub-records from
    /// earlier windows for the same identifier are kept.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::Spatial`] if the grid index cannot be built.
    pub fn compute_trends_at(
        &mut self,
        boundaries: &[Boundary],
        points: &[PointRecord],
        window: TimeWindow,
        selection: &CategorySelection,
        reference: ReferenceTime,
    ) -> Result<BTreeMap<String, TrendRecord>, TrendError> {
        let (fresh, diagnostics) = aggregate_window(
            boundaries,
            points,
            window,
            selection,
            &reference,
            self.config.grid_size,
            &mut self.cache,
        )?;

        let prior = self.cache.last_computed_trends();
        let merged: BTreeMap<String, TrendRecord> = fresh
            .into_iter()
            .map(|(id, record)| {
                let merged = merge_window(prior.and_then(|p| p.get(&id)), record);
                (id, merged)
            })
            .collect();

        log::info!(
            "Computed {window} trends for {} neighborhoods from {} points \
             ({} recent, {} previous, {} filtered, {} skipped)",
            merged.len(),
            diagnostics.total_points,
            diagnostics.recent_points,
            diagnostics.previous_points,
            diagnostics.filtered_points,
            diagnostics.skipped_points.values().sum::<u64>()
        );

        self.diagnostics = diagnostics;
        self.cache.store_trends(merged.clone());
        Ok(merged)
    }

    /// Normalizes decoded neighborhood and incident collections, then
    /// computes trends as [`Self::compute_trends_at`] does.
    ///
    /// Records skipped during normalization are added to the diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`TrendError::MalformedInput`] if either collection lacks
    /// its record array. The cache is left untouched in that case.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_trends_from_json(
        &mut self,
        neighborhoods: &Value,
        incidents: &Value,
        boundary_fields: &BoundaryFieldMapping,
        incident_fields: &IncidentFieldMapping,
        window: TimeWindow,
        selection: &CategorySelection,
        reference: ReferenceTime,
    ) -> Result<BTreeMap<String, TrendRecord>, TrendError> {
        let boundaries = parse_neighborhoods(neighborhoods, boundary_fields)?;
        let points = parse_incidents(incidents, incident_fields)?;

        log::debug!(
            "Normalized {} neighborhoods ({} skipped) and {} incidents ({} skipped)",
            boundaries.records.len(),
            boundaries.total_skipped(),
            points.records.len(),
            points.total_skipped()
        );

        let trends = self.compute_trends_at(
            &boundaries.records,
            &points.records,
            window,
            selection,
            reference,
        )?;

        add_counts(&mut self.diagnostics.skipped_boundaries, &boundaries.skipped);
        add_counts(&mut self.diagnostics.skipped_points, &points.skipped);
        self.diagnostics.total_points += points.total_skipped();

        Ok(trends)
    }

    /// Projects the cached results onto `window`. Empty if nothing has
    /// been computed yet.
    #[must_use]
    pub fn trends_for_window(&self, window: TimeWindow) -> BTreeMap<String, TrendRecord> {
        self.cache
            .last_computed_trends()
            .map(|all| trends_for_window(all, window))
            .unwrap_or_default()
    }

    /// Diagnostics of the most recent computation.
    #[must_use]
    pub const fn diagnostics(&self) -> &TrendDiagnostics {
        &self.diagnostics
    }

    /// Bounding boxes and the last merged results.
    #[must_use]
    pub const fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Mutable cache access, for invalidating entries when a dataset
    /// changes.
    pub const fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }
}

fn add_counts(into: &mut SkipCounts, from: &SkipCounts) {
    for (reason, count) in from {
        *into.entry(*reason).or_default() += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use safety_trends_boundary_models::{BoundaryGeometry, PolygonRings, Vertex};
    use safety_trends_ingest_models::SkipReason;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
    }

    fn engine() -> TrendEngine {
        TrendEngine::new(EngineConfig {
            grid_size: 0.01,
            analysis_year: 2024,
        })
        .unwrap()
        .with_now(now())
    }

    fn square(id: &str, lat: f64, lon: f64) -> Boundary {
        Boundary::new(
            id,
            id,
            BoundaryGeometry::Polygon(PolygonRings::exterior(vec![
                Vertex::new(lat, lon),
                Vertex::new(lat, lon + 1.0),
                Vertex::new(lat + 1.0, lon + 1.0),
                Vertex::new(lat + 1.0, lon),
            ])),
        )
    }

    fn points() -> Vec<PointRecord> {
        vec![
            // 6months: recent; 1year: recent (2025 is outside 1year/2024).
            PointRecord::new(0.5, 0.5, "2025-05-01T00:00:00Z", "Robbery"),
            PointRecord::new(0.5, 0.5, "2025-03-01T00:00:00Z", "Robbery"),
            // 1year recent, 2years recent.
            PointRecord::new(0.5, 0.5, "2024-03-01", "Robbery"),
            PointRecord::new(0.5, 0.5, "2024-04-01", "Vandalism"),
            // 1year previous, 2years recent.
            PointRecord::new(0.5, 0.5, "2023-03-01", "Robbery"),
            // 2years previous.
            PointRecord::new(0.5, 0.5, "2021-03-01", "Robbery"),
        ]
    }

    #[test]
    fn rejects_invalid_grid_size() {
        for grid_size in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = EngineConfig {
                grid_size,
                ..EngineConfig::default()
            };
            assert!(
                matches!(TrendEngine::new(config), Err(TrendError::Config(_))),
                "grid size {grid_size} should be rejected"
            );
        }
    }

    #[test]
    fn pinned_reference_time_is_used() {
        let engine = engine();
        assert_eq!(engine.reference_time(), ReferenceTime::new(now(), 2024));
    }

    #[test]
    fn computes_one_year_trends() {
        let mut engine = engine();
        let trends = engine
            .compute_trends(
                &[square("a", 0.0, 0.0)],
                &points(),
                TimeWindow::OneYear,
                &CategorySelection::all(),
            )
            .unwrap();

        let a = &trends["a"];
        assert_eq!(a.recent_count, 2);
        assert_eq!(a.previous_count, 1);
        assert_eq!(a.change_percent, 100);
        assert_eq!(a.categories["Vandalism"], 1);
        assert_eq!(engine.diagnostics().total_points, 6);
        assert_eq!(engine.diagnostics().other_points, 3);
        assert_eq!(engine.cache().last_computed_trends(), Some(&trends));
    }

    #[test]
    fn window_round_trip_restores_original_counts() {
        let mut engine = engine();
        let boundaries = [square("a", 0.0, 0.0), square("b", 10.0, 10.0)];
        let points = points();
        let all = CategorySelection::all();

        let first = engine
            .compute_trends(&boundaries, &points, TimeWindow::OneYear, &all)
            .unwrap();
        let second = engine
            .compute_trends(&boundaries, &points, TimeWindow::TwoYears, &all)
            .unwrap();
        assert_eq!(second["a"].recent_count, 3);
        assert_eq!(second["a"].previous_count, 1);
        assert_eq!(second["a"].windows.len(), 2, "one-year result is kept");

        let third = engine
            .compute_trends(&boundaries, &points, TimeWindow::OneYear, &all)
            .unwrap();
        for id in ["a", "b"] {
            assert_eq!(third[id].recent_count, first[id].recent_count, "{id}");
            assert_eq!(third[id].previous_count, first[id].previous_count, "{id}");
            assert_eq!(third[id].change_percent, first[id].change_percent, "{id}");
        }
        assert_eq!(
            third["a"].window_trend(TimeWindow::TwoYears),
            second["a"].window_trend(TimeWindow::TwoYears)
        );
    }

    #[test]
    fn projection_over_cached_results() {
        let mut engine = engine();
        assert!(engine.trends_for_window(TimeWindow::OneYear).is_empty());

        let boundaries = [square("a", 0.0, 0.0), square("b", 10.0, 10.0)];
        let all = CategorySelection::all();
        let six_months = engine
            .compute_trends(&boundaries, &points(), TimeWindow::SixMonths, &all)
            .unwrap();
        let one_year = engine
            .compute_trends(&boundaries, &points(), TimeWindow::OneYear, &all)
            .unwrap();

        for (window, original) in [
            (TimeWindow::SixMonths, &six_months),
            (TimeWindow::OneYear, &one_year),
        ] {
            let projected = engine.trends_for_window(window);
            assert_eq!(projected.len(), original.len());
            for (id, record) in original {
                let view = &projected[id];
                assert_eq!(view.window, record.window, "{window} {id}");
                assert_eq!(view.recent_count, record.recent_count, "{window} {id}");
                assert_eq!(view.previous_count, record.previous_count, "{window} {id}");
                assert_eq!(view.change_percent, record.change_percent, "{window} {id}");
                assert_eq!(view.categories, record.categories, "{window} {id}");
                assert_eq!(
                    view.window_trend(window),
                    record.window_trend(window),
                    "{window} {id}"
                );
            }
        }

        let two_years = engine.trends_for_window(TimeWindow::TwoYears);
        assert_eq!(two_years["a"].recent_count, 0, "never computed");
    }

    #[test]
    fn bounds_are_cached_and_invalidated() {
        let mut engine = engine();
        let boundaries = [square("a", 0.0, 0.0)];
        engine
            .compute_trends(
                &boundaries,
                &[],
                TimeWindow::OneYear,
                &CategorySelection::all(),
            )
            .unwrap();

        let bbox = engine.cache().bounds_for("a").unwrap();
        assert!((bbox.max_lat - 1.0).abs() < f64::EPSILON);

        engine.cache_mut().invalidate("a");
        assert!(engine.cache().bounds_for("a").is_none());
        engine.cache_mut().clear();
        assert!(engine.cache().last_computed_trends().is_none());
    }

    #[test]
    fn from_json_counts_ingest_skips() {
        let neighborhoods = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": { "name": "Square" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0], [0.0, 0.0]]]
                    }
                },
                { "type": "Feature", "properties": { "name": "Nowhere" }, "geometry": null }
            ]
        });
        let incidents = json!({
            "incidents": [
                { "latitude": 0.5, "longitude": 0.5, "occurred_at": "2024-02-01", "category": "Robbery" },
                { "latitude": "0.25", "longitude": "0.25", "occurred_at": "2023-02-01", "category": "Robbery" },
                { "latitude": 0.5, "longitude": 0.5, "category": "Robbery" },
                "garbage"
            ]
        });

        let mut engine = engine();
        let trends = engine
            .compute_trends_from_json(
                &neighborhoods,
                &incidents,
                &BoundaryFieldMapping::default(),
                &IncidentFieldMapping::default(),
                TimeWindow::OneYear,
                &CategorySelection::all(),
                ReferenceTime::new(now(), 2024),
            )
            .unwrap();

        assert_eq!(trends.len(), 1);
        assert_eq!(trends["square"].recent_count, 1);
        assert_eq!(trends["square"].previous_count, 1);

        let diagnostics = engine.diagnostics();
        assert_eq!(diagnostics.total_points, 4);
        assert_eq!(diagnostics.skipped_points[&SkipReason::MissingTimestamp], 1);
        assert_eq!(diagnostics.skipped_points[&SkipReason::MalformedRecord], 1);
        assert_eq!(diagnostics.skipped_boundaries[&SkipReason::MissingGeometry], 1);
    }

    #[test]
    fn malformed_json_yields_error_and_keeps_cache() {
        let mut engine = engine();
        engine
            .compute_trends(
                &[square("a", 0.0, 0.0)],
                &points(),
                TimeWindow::OneYear,
                &CategorySelection::all(),
            )
            .unwrap();
        let before = engine.cache().last_computed_trends().cloned();

        let result = engine.compute_trends_from_json(
            &json!({ "type": "FeatureCollection" }),
            &json!({ "incidents": [] }),
            &BoundaryFieldMapping::default(),
            &IncidentFieldMapping::default(),
            TimeWindow::OneYear,
            &CategorySelection::all(),
            ReferenceTime::new(now(), 2024),
        );
        assert!(matches!(result, Err(TrendError::MalformedInput(_))));
        assert!(result.unwrap_or_default().is_empty());
        assert_eq!(engine.cache().last_computed_trends().cloned(), before);
    }
}
