//! One NWP model configuration: grid, step, storage roots, capabilities.

use forecast_common::{PressureVariable, SurfaceVariable, WeatherVariable};
use met_grid::{ElevationMap, Grid};
use series_store::ShardLayout;
use std::path::PathBuf;

/// A named model domain.
///
/// Owns its grid and file roots. What a domain can answer is data, not code:
/// the stored variable lists plus two derivation flags, consulted together
/// with each variable's capability table.
#[derive(Debug)]
pub struct Domain {
    /// Model identifier, e.g. `icon` or `icon_d2`.
    pub model: String,
    pub grid: Grid,
    /// Companion elevation map, when the domain ships one.
    pub elevation: Option<ElevationMap>,
    /// Model step width in seconds.
    pub dt_seconds: i64,
    /// Timesteps per rolling column file.
    pub om_file_length: usize,
    /// Rolling column file directory.
    pub directory: PathBuf,
    /// Optional yearly archive directory.
    pub archive_directory: Option<PathBuf>,
    /// Surface variables this domain stores.
    pub surface_variables: Vec<SurfaceVariable>,
    /// Pressure-level variables this domain stores.
    pub pressure_variables: Vec<PressureVariable>,
    /// Isobaric levels this domain stores, in hPa.
    pub pressure_levels: Vec<i32>,
    /// No stored cloud cover on pressure levels; derive it from relative
    /// humidity.
    pub derives_pressure_cloud_cover: bool,
    /// No stored diffuse radiation; derive it from global shortwave.
    pub derives_diffuse_radiation: bool,
}

impl Domain {
    /// Shard layout for this domain's splitter.
    pub fn shard_layout(&self) -> ShardLayout {
        ShardLayout {
            directory: self.directory.clone(),
            archive_directory: self.archive_directory.clone(),
            dt_seconds: self.dt_seconds,
            om_file_length: self.om_file_length,
            n_locations: self.grid.count(),
        }
    }

    /// Stored levels bracketing `level`, if both sides exist.
    pub fn bracketing_levels(&self, level: i32) -> Option<(i32, i32)> {
        let lower = self.pressure_levels.iter().copied().filter(|l| *l < level).max()?;
        let upper = self.pressure_levels.iter().copied().filter(|l| *l > level).min()?;
        Some((lower, upper))
    }

    /// Whether this domain can answer `variable`, directly, by level
    /// synthesis, or by derivation.
    pub fn supports(&self, variable: WeatherVariable) -> bool {
        match variable {
            WeatherVariable::Surface(v) => {
                self.surface_variables.contains(&v)
                    || (v == SurfaceVariable::DiffuseRadiation
                        && self.derives_diffuse_radiation
                        && self.surface_variables.contains(&SurfaceVariable::ShortwaveRadiation))
            }
            WeatherVariable::Pressure { variable: v, level } => {
                let stored = self.pressure_variables.contains(&v)
                    || (v == PressureVariable::CloudCover
                        && self.derives_pressure_cloud_cover
                        && self
                            .pressure_variables
                            .contains(&PressureVariable::RelativeHumidity));
                if !stored {
                    return false;
                }
                self.pressure_levels.contains(&level)
                    || (variable.capabilities().can_interpolate_pressure
                        && self.bracketing_levels(level).is_some())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use met_grid::RegularGrid;

    fn domain() -> Domain {
        Domain {
            model: "test".to_string(),
            grid: Grid::Regular(RegularGrid::new(10, 10, 0.0, 0.0, 0.1, 0.1)),
            elevation: None,
            dt_seconds: 3600,
            om_file_length: 168,
            directory: PathBuf::from("/data/test"),
            archive_directory: None,
            surface_variables: vec![
                SurfaceVariable::Temperature2m,
                SurfaceVariable::ShortwaveRadiation,
            ],
            pressure_variables: vec![
                PressureVariable::Temperature,
                PressureVariable::RelativeHumidity,
            ],
            pressure_levels: vec![850, 1000],
            derives_pressure_cloud_cover: true,
            derives_diffuse_radiation: true,
        }
    }

    #[test]
    fn test_supports_stored_surface() {
        let d = domain();
        assert!(d.supports(WeatherVariable::Surface(SurfaceVariable::Temperature2m)));
        assert!(!d.supports(WeatherVariable::Surface(SurfaceVariable::Precipitation)));
    }

    #[test]
    fn test_supports_derived_diffuse() {
        let d = domain();
        assert!(d.supports(WeatherVariable::Surface(SurfaceVariable::DiffuseRadiation)));

        let mut without = domain();
        without.derives_diffuse_radiation = false;
        assert!(!without.supports(WeatherVariable::Surface(SurfaceVariable::DiffuseRadiation)));
    }

    #[test]
    fn test_supports_pressure_synthesis() {
        let d = domain();
        let stored = WeatherVariable::Pressure {
            variable: PressureVariable::Temperature,
            level: 850,
        };
        let between = WeatherVariable::Pressure {
            variable: PressureVariable::Temperature,
            level: 950,
        };
        let below_all = WeatherVariable::Pressure {
            variable: PressureVariable::Temperature,
            level: 500,
        };
        assert!(d.supports(stored));
        assert!(d.supports(between));
        assert!(!d.supports(below_all));
    }

    #[test]
    fn test_supports_derived_pressure_cloud_cover() {
        let d = domain();
        assert!(d.supports(WeatherVariable::Pressure {
            variable: PressureVariable::CloudCover,
            level: 850,
        }));

        let mut without = domain();
        without.derives_pressure_cloud_cover = false;
        assert!(!without.supports(WeatherVariable::Pressure {
            variable: PressureVariable::CloudCover,
            level: 850,
        }));
    }

    #[test]
    fn test_bracketing_levels() {
        let d = domain();
        assert_eq!(d.bracketing_levels(950), Some((850, 1000)));
        assert_eq!(d.bracketing_levels(500), None);
        assert_eq!(d.bracketing_levels(1050), None);
    }
}
