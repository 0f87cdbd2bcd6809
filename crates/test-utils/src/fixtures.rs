//! On-disk domain fixtures backed by real column files.

use forecast_common::{PressureVariable, SurfaceVariable, TimerangeDt, WeatherVariable};
use met_grid::{ElevationMap, Grid, RegularGrid};
use point_query::Domain;
use series_store::Splitter;
use std::path::Path;

/// A small hourly test domain over a 10×10 regular grid at
/// (40..41°N, 0..1°E) with week-long shards.
///
/// Every surface and pressure variable is declared as stored; tests narrow
/// the lists or flip the derivation flags as needed. If `dir` already holds
/// an `elevation.om` (see [`ElevationMap::write`]) it is picked up.
pub fn test_domain(dir: &Path, dt_seconds: i64) -> Domain {
    Domain {
        model: "test".to_string(),
        grid: Grid::Regular(RegularGrid::new(10, 10, 40.0, 0.0, 0.1, 0.1)),
        elevation: ElevationMap::open(dir).ok(),
        dt_seconds,
        om_file_length: 168,
        directory: dir.to_path_buf(),
        archive_directory: None,
        surface_variables: vec![
            SurfaceVariable::Temperature2m,
            SurfaceVariable::RelativeHumidity2m,
            SurfaceVariable::Precipitation,
            SurfaceVariable::CloudCover,
            SurfaceVariable::PressureMsl,
            SurfaceVariable::WindSpeed10m,
            SurfaceVariable::WindDirection10m,
            SurfaceVariable::ShortwaveRadiation,
            SurfaceVariable::DiffuseRadiation,
        ],
        pressure_variables: vec![
            PressureVariable::Temperature,
            PressureVariable::RelativeHumidity,
            PressureVariable::GeopotentialHeight,
        ],
        pressure_levels: Vec::new(),
        derives_pressure_cloud_cover: false,
        derives_diffuse_radiation: false,
    }
}

/// Write a variable's series for every grid point of a domain.
///
/// `value` receives `(location, step_index)` relative to `range`.
pub fn seed_series(
    domain: &Domain,
    variable: WeatherVariable,
    range: TimerangeDt,
    value: impl Fn(usize, i64) -> f32,
) {
    let n_locations = domain.grid.count();
    let mut values = Vec::with_capacity(n_locations * range.count());
    for location in 0..n_locations {
        for step in 0..range.count() as i64 {
            values.push(value(location, step));
        }
    }
    Splitter::new(domain.shard_layout())
        .write(
            &variable.file_stem(),
            variable.scalefactor(),
            0..n_locations,
            range,
            &values,
        )
        .expect("failed to seed test series");
}
