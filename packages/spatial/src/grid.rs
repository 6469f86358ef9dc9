//! Fixed-size grid index over incident points.
//!
//! Points are binned by `(floor(lon / size), floor(lat / size))`. A query
//! walks every cell overlapping a bounding box and keeps only the points
//! that fall inside the box itself, which is a cheap prefilter ahead of
//! exact polygon containment.
//!
//! One index is built per disjoint point set (e.g. one for the recent
//! period and one for the previous period) and dropped after use.

use std::collections::BTreeMap;

use safety_trends_boundary_models::BoundingBox;
use safety_trends_incident_models::PointRecord;

use crate::SpatialError;

/// Default cell edge in degrees (roughly 1 km at mid latitudes).
pub const DEFAULT_GRID_SIZE: f64 = 0.01;

/// Grid cell key: `(x, y)` = `(floor(lon / size), floor(lat / size))`.
type CellKey = (i64, i64);

/// Points binned into fixed-size grid cells.
///
/// Cell membership preserves insertion order, so identical input yields
/// identical query output.
#[derive(Debug)]
pub struct GridIndex<'a> {
    grid_size: f64,
    cells: BTreeMap<CellKey, Vec<&'a PointRecord>>,
    len: usize,
}

impl<'a> GridIndex<'a> {
    /// Bins `points` into cells of `grid_size` degrees.
    ///
    /// Points without a location are skipped silently.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidGridSize`] if `grid_size` is not a
    /// positive, finite number.
    pub fn build<I>(points: I, grid_size: f64) -> Result<Self, SpatialError>
    where
        I: IntoIterator<Item = &'a PointRecord>,
    {
        if !(grid_size.is_finite() && grid_size > 0.0) {
            return Err(SpatialError::InvalidGridSize(grid_size));
        }

        let mut cells: BTreeMap<CellKey, Vec<&'a PointRecord>> = BTreeMap::new();
        let mut len = 0;

        for point in points {
            let Some(location) = point.location else {
                continue;
            };
            let key = (
                cell_coord(location.longitude, grid_size),
                cell_coord(location.latitude, grid_size),
            );
            cells.entry(key).or_default().push(point);
            len += 1;
        }

        Ok(Self {
            grid_size,
            cells,
            len,
        })
    }

    /// Returns the cell edge in degrees.
    #[must_use]
    pub const fn grid_size(&self) -> f64 {
        self.grid_size
    }

    /// Number of indexed points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the index holds no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of occupied cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns every indexed point inside `bbox`.
    ///
    /// Walks cells `x` in `floor(min_lon / size)..=floor(max_lon / size)`
    /// and, within each column, `y` in `floor(min_lat / size)..=floor(max_lat / size)`,
    /// then keeps points passing the inclusive bounding-box test. Output
    /// order is column-major over cells, insertion order within a cell.
    #[must_use]
    pub fn query(&self, bbox: &BoundingBox) -> Vec<&'a PointRecord> {
        if !bbox.is_finite() {
            return Vec::new();
        }

        let min_x = cell_coord(bbox.min_lon, self.grid_size);
        let max_x = cell_coord(bbox.max_lon, self.grid_size);
        let min_y = cell_coord(bbox.min_lat, self.grid_size);
        let max_y = cell_coord(bbox.max_lat, self.grid_size);

        if min_x > max_x || min_y > max_y {
            return Vec::new();
        }

        // Keys are ordered (x, y), so this range visits exactly the
        // occupied cells of columns min_x..=max_x in scan order.
        self.cells
            .range((min_x, i64::MIN)..=(max_x, i64::MAX))
            .filter(|((_, y), _)| (min_y..=max_y).contains(y))
            .flat_map(|(_, points)| points.iter().copied())
            .filter(|point| {
                point
                    .location
                    .is_some_and(|loc| bbox.contains(loc.latitude, loc.longitude))
            })
            .collect()
    }
}

#[allow(clippy::cast_possible_truncation)]
fn cell_coord(degrees: f64, grid_size: f64) -> i64 {
    (degrees / grid_size).floor() as i64
}
