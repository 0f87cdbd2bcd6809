//! Elevation-aware grid point selection.

use crate::elevation::{is_sea, ElevationMap};
use crate::grid::{great_circle_distance, Grid};
use serde::{Deserialize, Serialize};

/// How to pick a grid cell for a query coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// The nearest cell, full stop.
    Nearest,
    /// Prefer a neighboring land cell whose terrain height matches the query
    /// elevation; mountain valleys resolve much better this way.
    #[default]
    TerrainOptimised,
}

/// A selected grid point with its geographic position and terrain height.
#[derive(Debug, Clone, Copy)]
pub struct GridPoint {
    pub index: usize,
    pub latitude: f64,
    pub longitude: f64,
    /// Height of the grid cell; NaN without an elevation map.
    pub grid_elevation: f32,
}

/// Select the grid point for `(lat, lon, elevation)`.
///
/// Returns `None` when the coordinate is outside the grid. With
/// [`SelectionMode::TerrainOptimised`] the 3×3 neighborhood of the nearest
/// cell is searched for the land cell minimizing the elevation difference;
/// ties break on great-circle distance, and an all-sea neighborhood falls
/// back to the raw nearest cell.
pub fn find_point(
    grid: &Grid,
    elevation_map: Option<&ElevationMap>,
    latitude: f64,
    longitude: f64,
    elevation: f32,
    mode: SelectionMode,
) -> Option<GridPoint> {
    let nearest = grid.find_index(latitude, longitude)?;

    let elevation_map = match (mode, elevation_map) {
        (SelectionMode::Nearest, _) | (_, None) => {
            return Some(point_at(grid, elevation_map, nearest));
        }
        (SelectionMode::TerrainOptimised, Some(map)) => map,
    };

    let mut best: Option<(usize, f32, f64)> = None;
    for candidate in grid.neighborhood(nearest) {
        let grid_elevation = elevation_map.elevation(candidate);
        if is_sea(grid_elevation) {
            continue;
        }
        let delta = if elevation.is_finite() {
            (grid_elevation - elevation).abs()
        } else {
            0.0
        };
        let (lat, lon) = grid.coordinates(candidate);
        let distance = great_circle_distance(latitude, longitude, lat, lon);

        let better = match best {
            None => true,
            Some((_, best_delta, best_distance)) => {
                delta < best_delta || (delta == best_delta && distance < best_distance)
            }
        };
        if better {
            best = Some((candidate, delta, distance));
        }
    }

    let index = best.map(|(i, _, _)| i).unwrap_or(nearest);
    Some(point_at(grid, Some(elevation_map), index))
}

fn point_at(grid: &Grid, elevation_map: Option<&ElevationMap>, index: usize) -> GridPoint {
    let (latitude, longitude) = grid.coordinates(index);
    GridPoint {
        index,
        latitude,
        longitude,
        grid_elevation: elevation_map.map(|m| m.elevation(index)).unwrap_or(f32::NAN),
    }
}
