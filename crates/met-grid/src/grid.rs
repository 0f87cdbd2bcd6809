//! Grid geometry: regular lat/lon lattices and Lambert conformal projections.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// A regular latitude/longitude lattice.
///
/// Point index is row-major: `index = y * nx + x` with `x` along longitude.
/// `dlat`/`dlon` may be negative for grids scanning north-to-south or
/// east-to-west.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegularGrid {
    /// Number of points along longitude.
    pub nx: usize,
    /// Number of points along latitude.
    pub ny: usize,
    /// Latitude of the first grid point.
    pub lat0: f64,
    /// Longitude of the first grid point.
    pub lon0: f64,
    /// Latitude increment per step.
    pub dlat: f64,
    /// Longitude increment per step.
    pub dlon: f64,
}

impl RegularGrid {
    pub fn new(nx: usize, ny: usize, lat0: f64, lon0: f64, dlat: f64, dlon: f64) -> Self {
        Self {
            nx,
            ny,
            lat0,
            lon0,
            dlat,
            dlon,
        }
    }

    /// Whether the grid wraps the full longitude circle.
    fn is_global_in_longitude(&self) -> bool {
        (self.nx as f64 * self.dlon.abs() - 360.0).abs() < self.dlon.abs()
    }

    /// Normalize a query longitude into the grid's native range.
    fn normalize_longitude(&self, lon: f64) -> f64 {
        let min = self.lon0.min(self.lon0 + (self.nx - 1) as f64 * self.dlon);
        let mut lon = lon;
        while lon < min {
            lon += 360.0;
        }
        while lon >= min + 360.0 {
            lon -= 360.0;
        }
        lon
    }

    fn coordinates(&self, index: usize) -> (f64, f64) {
        let x = index % self.nx;
        let y = index / self.nx;
        (
            self.lat0 + y as f64 * self.dlat,
            self.lon0 + x as f64 * self.dlon,
        )
    }

    fn find_index(&self, lat: f64, lon: f64) -> Option<usize> {
        let lat = lat.clamp(-90.0, 90.0);
        let lon = self.normalize_longitude(lon);

        let y = ((lat - self.lat0) / self.dlat).round() as i64;
        let mut x = ((lon - self.lon0) / self.dlon).round() as i64;

        if x == self.nx as i64 && self.is_global_in_longitude() {
            x = 0;
        }
        if x < 0 || y < 0 || x >= self.nx as i64 || y >= self.ny as i64 {
            return None;
        }
        Some(y as usize * self.nx + x as usize)
    }
}

/// A Lambert conformal conic grid as used by regional models.
///
/// Projection constants are precomputed in the constructor; grid indexing is
/// done in projected metres relative to the first grid point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LambertGrid {
    pub nx: usize,
    pub ny: usize,
    /// Grid spacing in projected metres.
    pub dx: f64,
    pub dy: f64,
    /// Central meridian in radians.
    lon0: f64,
    /// Cone constant.
    n: f64,
    /// Projection scaling constant.
    f: f64,
    /// Radial distance of the projection origin.
    rho0: f64,
    /// Projected coordinates of the first grid point.
    x1: f64,
    y1: f64,
}

/// Mean Earth radius used by the projection, in metres.
const EARTH_RADIUS: f64 = 6_371_229.0;

impl LambertGrid {
    /// Build from the usual model parameters (all angles in degrees).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        nx: usize,
        ny: usize,
        lat1_deg: f64,
        lon1_deg: f64,
        lov_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        dx: f64,
        dy: f64,
    ) -> Self {
        let to_rad = PI / 180.0;
        let latin1 = latin1_deg * to_rad;
        let latin2 = latin2_deg * to_rad;
        let lon0 = lov_deg * to_rad;

        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            (latin1.cos() / latin2.cos()).ln()
                / ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln()
        };
        let f = latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n) / n;
        let rho0 = EARTH_RADIUS * f / (PI / 4.0 + latin1 / 2.0).tan().powf(n);

        let mut grid = Self {
            nx,
            ny,
            dx,
            dy,
            lon0,
            n,
            f,
            rho0,
            x1: 0.0,
            y1: 0.0,
        };
        let (x1, y1) = grid.project(lat1_deg, lon1_deg);
        grid.x1 = x1;
        grid.y1 = y1;
        grid
    }

    /// Forward projection to metres.
    fn project(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg * PI / 180.0;
        let lon = lon_deg * PI / 180.0;
        let rho = EARTH_RADIUS * self.f / (PI / 4.0 + lat / 2.0).tan().powf(self.n);
        let mut dlon = lon - self.lon0;
        // Keep the angular difference in (-PI, PI] so grids straddling the
        // antimeridian project continuously.
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon <= -PI {
            dlon += 2.0 * PI;
        }
        let theta = self.n * dlon;
        (rho * theta.sin(), self.rho0 - rho * theta.cos())
    }

    /// Inverse projection from metres.
    fn unproject(&self, x: f64, y: f64) -> (f64, f64) {
        let rho = (x * x + (self.rho0 - y) * (self.rho0 - y)).sqrt() * self.n.signum();
        let theta = (x / (self.rho0 - y)).atan();
        let lat = 2.0 * (EARTH_RADIUS * self.f / rho).powf(1.0 / self.n).atan() - PI / 2.0;
        let lon = self.lon0 + theta / self.n;
        (lat * 180.0 / PI, lon * 180.0 / PI)
    }

    fn coordinates(&self, index: usize) -> (f64, f64) {
        let i = index % self.nx;
        let j = index / self.nx;
        self.unproject(self.x1 + i as f64 * self.dx, self.y1 + j as f64 * self.dy)
    }

    fn find_index(&self, lat: f64, lon: f64) -> Option<usize> {
        let (x, y) = self.project(lat.clamp(-90.0, 90.0), lon);
        let i = ((x - self.x1) / self.dx).round() as i64;
        let j = ((y - self.y1) / self.dy).round() as i64;
        if i < 0 || j < 0 || i >= self.nx as i64 || j >= self.ny as i64 {
            return None;
        }
        Some(j as usize * self.nx + i as usize)
    }
}

/// A model grid: one of the supported families.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Grid {
    Regular(RegularGrid),
    Lambert(LambertGrid),
}

impl Grid {
    /// Total number of points.
    pub fn count(&self) -> usize {
        match self {
            Self::Regular(g) => g.nx * g.ny,
            Self::Lambert(g) => g.nx * g.ny,
        }
    }

    /// Geographic coordinates `(lat, lon)` of a point index.
    pub fn coordinates(&self, index: usize) -> (f64, f64) {
        match self {
            Self::Regular(g) => g.coordinates(index),
            Self::Lambert(g) => g.coordinates(index),
        }
    }

    /// Nearest grid point to `(lat, lon)`, or `None` outside the grid.
    pub fn find_index(&self, lat: f64, lon: f64) -> Option<usize> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        match self {
            Self::Regular(g) => g.find_index(lat, lon),
            Self::Lambert(g) => g.find_index(lat, lon),
        }
    }

    /// Point indices of the 3×3 neighborhood around `index`, clipped at the
    /// grid edges. The center is included.
    pub fn neighborhood(&self, index: usize) -> Vec<usize> {
        let nx = match self {
            Self::Regular(g) => g.nx,
            Self::Lambert(g) => g.nx,
        } as i64;
        let ny = match self {
            Self::Regular(g) => g.ny,
            Self::Lambert(g) => g.ny,
        } as i64;

        let x = index as i64 % nx;
        let y = index as i64 / nx;
        let mut out = Vec::with_capacity(9);
        for dy in -1..=1 {
            for dx in -1..=1 {
                let (cx, cy) = (x + dx, y + dy);
                if cx >= 0 && cy >= 0 && cx < nx && cy < ny {
                    out.push((cy * nx + cx) as usize);
                }
            }
        }
        out
    }
}

/// Great-circle distance between two points in metres (haversine).
pub fn great_circle_distance(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let to_rad = PI / 180.0;
    let dlat = (lat_b - lat_a) * to_rad / 2.0;
    let dlon = (lon_b - lon_a) * to_rad / 2.0;
    let a = dlat.sin().powi(2)
        + (lat_a * to_rad).cos() * (lat_b * to_rad).cos() * dlon.sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().asin()
}

/// Grid definitions for common NWP models.
pub mod grids {
    use super::*;

    /// ICON-style 0.25° global grid, scanning west to east and south to
    /// north from (90°S, 180°W).
    pub fn global_0p25() -> Grid {
        Grid::Regular(RegularGrid::new(1440, 721, -90.0, -180.0, 0.25, 0.25))
    }

    /// GFS-style 0.25° global grid on a 0..360 longitude range, north to
    /// south.
    pub fn gfs_0p25() -> Grid {
        Grid::Regular(RegularGrid::new(1440, 721, 90.0, 0.0, -0.25, 0.25))
    }

    /// HRRR-style 3 km Lambert conformal CONUS grid.
    pub fn hrrr_conus() -> Grid {
        Grid::Lambert(LambertGrid::new(
            1799, 1059, 21.138123, -122.719528, -97.5, 38.5, 38.5, 3000.0, 3000.0,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_index_coordinate_round_trip() {
        let grid = grids::global_0p25();
        for index in [0usize, 1, 1440, 519840, 1440 * 721 - 1] {
            let (lat, lon) = grid.coordinates(index);
            assert_eq!(grid.find_index(lat, lon), Some(index), "index {}", index);
        }
    }

    #[test]
    fn test_regular_nearest_rounding() {
        let grid = grids::global_0p25();
        // 0.1° east of a grid point still snaps to it.
        let (lat, lon) = grid.coordinates(100_000);
        assert_eq!(grid.find_index(lat + 0.1, lon - 0.1), Some(100_000));
    }

    #[test]
    fn test_longitude_normalization_across_ranges() {
        // A 0..360 grid must accept negative longitudes.
        let grid = grids::gfs_0p25();
        let idx_neg = grid.find_index(47.0, -8.5).unwrap();
        let idx_pos = grid.find_index(47.0, 351.5).unwrap();
        assert_eq!(idx_neg, idx_pos);
    }

    #[test]
    fn test_global_wraparound() {
        let grid = grids::gfs_0p25();
        // Just west of the prime meridian wraps to column 0, not out of range.
        let idx = grid.find_index(0.0, 359.95);
        assert!(idx.is_some());
        let (_, lon) = grid.coordinates(idx.unwrap());
        assert!((lon - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_latitude_clamped() {
        let grid = grids::global_0p25();
        assert_eq!(grid.find_index(95.0, 0.0), grid.find_index(90.0, 0.0));
    }

    #[test]
    fn test_lambert_round_trip() {
        let grid = grids::hrrr_conus();
        for index in [0usize, 1799, 500_000, 1_000_000] {
            let (lat, lon) = grid.coordinates(index);
            assert_eq!(grid.find_index(lat, lon), Some(index), "index {}", index);
        }
    }

    #[test]
    fn test_lambert_outside_domain() {
        let grid = grids::hrrr_conus();
        // Central Europe is far outside a CONUS Lambert grid.
        assert_eq!(grid.find_index(48.0, 11.0), None);
    }

    #[test]
    fn test_neighborhood_interior_and_corner() {
        let grid = Grid::Regular(RegularGrid::new(10, 10, 0.0, 0.0, 1.0, 1.0));
        assert_eq!(grid.neighborhood(55).len(), 9);
        assert_eq!(grid.neighborhood(0).len(), 4);
        assert_eq!(grid.neighborhood(9).len(), 4);
        assert!(grid.neighborhood(55).contains(&55));
    }

    #[test]
    fn test_great_circle_distance() {
        // One degree of latitude is ~111 km.
        let d = great_circle_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_195.0).abs() < 500.0);
        assert_eq!(great_circle_distance(45.0, 9.0, 45.0, 9.0), 0.0);
    }
}
