//! Per-point variable access for one domain.

use crate::atmosphere;
use crate::context::QueryContext;
use crate::derive;
use crate::domain::Domain;
use crate::error::{QueryError, Result};
use crate::interpolate;
use forecast_common::{
    InterpolationKind, PressureVariable, SurfaceVariable, TimerangeDt, Unit, WeatherVariable,
};
use met_grid::{find_point, is_sea, GridPoint, SelectionMode};
use series_store::Splitter;
use std::sync::Arc;

/// Standard atmospheric lapse rate in K/m, applied between the grid-cell
/// elevation and the query elevation.
const LAPSE_RATE: f32 = 0.0065;

/// A decoded series with its unit.
#[derive(Debug, Clone)]
pub struct VariableSeries {
    pub values: Vec<f32>,
    pub unit: Unit,
}

/// The unit a variable is served in (stored pascals are served as hPa).
pub(crate) fn served_unit(variable: WeatherVariable) -> Unit {
    match variable.unit() {
        Unit::Pascal => Unit::Hectopascal,
        unit => unit,
    }
}

/// A reader bound to one `(domain, grid point)` pair.
///
/// Created per request; resolves the query coordinate to a grid point once
/// and owns a splitter over the domain's storage roots.
pub struct PointReader {
    domain: Arc<Domain>,
    splitter: Splitter,
    point: GridPoint,
    target_elevation: f32,
}

impl PointReader {
    /// Bind a domain to a query coordinate, or `None` when the coordinate is
    /// outside the domain's grid.
    pub fn new(
        domain: Arc<Domain>,
        latitude: f64,
        longitude: f64,
        elevation: f32,
        mode: SelectionMode,
    ) -> Option<Self> {
        let point = find_point(
            &domain.grid,
            domain.elevation.as_ref(),
            latitude,
            longitude,
            elevation,
            mode,
        )?;
        let splitter = Splitter::new(domain.shard_layout());
        Some(Self {
            domain,
            splitter,
            point,
            target_elevation: elevation,
        })
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn point(&self) -> &GridPoint {
        &self.point
    }

    pub fn supports(&self, variable: WeatherVariable) -> bool {
        self.domain.supports(variable)
    }

    /// Fetch a variable over `range`, resampling when the query step is finer
    /// than the domain step.
    pub fn get(
        &self,
        variable: WeatherVariable,
        range: TimerangeDt,
        ctx: &QueryContext,
    ) -> Result<VariableSeries> {
        let domain_dt = self.domain.dt_seconds;
        if range.dt_seconds == domain_dt {
            return self.fetch(variable, range, ctx);
        }
        if range.dt_seconds > domain_dt || domain_dt % range.dt_seconds != 0 {
            return Err(QueryError::UpsamplingForbidden {
                query_dt: range.dt_seconds,
                domain_dt,
            });
        }

        let kind = variable.interpolation();
        let src = interpolate::source_window(&range, domain_dt, kind);
        let series = self.fetch(variable, src, ctx)?;
        let values = match kind {
            InterpolationKind::Linear => interpolate::linear(&series.values, &src, &range),
            InterpolationKind::Hermite { bounds } => {
                interpolate::hermite(&series.values, &src, &range, bounds)
            }
            InterpolationKind::SolarBackwardsAveraged => interpolate::solar_backwards(
                &series.values,
                &src,
                &range,
                self.point.latitude,
                self.point.longitude,
            ),
        };
        Ok(VariableSeries {
            values,
            unit: series.unit,
        })
    }

    /// Advise storage about an upcoming [`get`](Self::get) with the same
    /// arguments. Advisory only; errors and unsupported steps are ignored.
    pub fn prefetch(&self, variable: WeatherVariable, range: TimerangeDt) {
        let domain_dt = self.domain.dt_seconds;
        let src = if range.dt_seconds == domain_dt {
            range
        } else if range.dt_seconds < domain_dt && domain_dt % range.dt_seconds == 0 {
            interpolate::source_window(&range, domain_dt, variable.interpolation())
        } else {
            return;
        };
        self.prefetch_resolved(variable, src);
    }

    fn prefetch_resolved(&self, variable: WeatherVariable, range: TimerangeDt) {
        match variable {
            WeatherVariable::Pressure { variable: v, level }
                if variable.capabilities().can_interpolate_pressure
                    && !self.domain.pressure_levels.contains(&level) =>
            {
                if let Some((lower, upper)) = self.domain.bracketing_levels(level) {
                    for level in [lower, upper] {
                        self.prefetch_resolved(
                            WeatherVariable::Pressure { variable: v, level },
                            range,
                        );
                    }
                }
            }
            WeatherVariable::Pressure {
                variable: PressureVariable::CloudCover,
                level,
            } if self.domain.derives_pressure_cloud_cover => {
                self.prefetch_resolved(
                    WeatherVariable::Pressure {
                        variable: PressureVariable::RelativeHumidity,
                        level,
                    },
                    range,
                );
            }
            WeatherVariable::Surface(SurfaceVariable::DiffuseRadiation)
                if self.domain.derives_diffuse_radiation =>
            {
                self.prefetch_resolved(
                    WeatherVariable::Surface(SurfaceVariable::ShortwaveRadiation),
                    range,
                );
            }
            _ => {
                self.splitter
                    .will_need(&variable.file_stem(), self.point.index, range);
            }
        }
    }

    /// Fetch at the domain step, routing through synthesis and derivation.
    fn fetch(
        &self,
        variable: WeatherVariable,
        range: TimerangeDt,
        ctx: &QueryContext,
    ) -> Result<VariableSeries> {
        match variable {
            WeatherVariable::Pressure { variable: v, level }
                if variable.capabilities().can_interpolate_pressure
                    && !self.domain.pressure_levels.contains(&level) =>
            {
                self.synthesize_level(v, level, range, ctx)
            }
            WeatherVariable::Pressure {
                variable: PressureVariable::CloudCover,
                level,
            } if self.domain.derives_pressure_cloud_cover => {
                let humidity = self.fetch(
                    WeatherVariable::Pressure {
                        variable: PressureVariable::RelativeHumidity,
                        level,
                    },
                    range,
                    ctx,
                )?;
                Ok(VariableSeries {
                    values: humidity
                        .values
                        .iter()
                        .map(|&rh| derive::cloud_cover_from_relative_humidity(rh))
                        .collect(),
                    unit: Unit::Percent,
                })
            }
            WeatherVariable::Surface(SurfaceVariable::DiffuseRadiation)
                if self.domain.derives_diffuse_radiation =>
            {
                let shortwave = self.fetch(
                    WeatherVariable::Surface(SurfaceVariable::ShortwaveRadiation),
                    range,
                    ctx,
                )?;
                Ok(VariableSeries {
                    values: derive::diffuse_from_shortwave(
                        &shortwave.values,
                        &range,
                        self.point.latitude,
                        self.point.longitude,
                    ),
                    unit: Unit::WattPerSquareMetre,
                })
            }
            _ => self.fetch_raw(variable, range, ctx),
        }
    }

    /// Synthesize a missing isobaric level from the bracketing stored levels.
    fn synthesize_level(
        &self,
        variable: PressureVariable,
        level: i32,
        range: TimerangeDt,
        ctx: &QueryContext,
    ) -> Result<VariableSeries> {
        let Some((lower, upper)) = self.domain.bracketing_levels(level) else {
            return Ok(VariableSeries {
                values: vec![f32::NAN; range.count()],
                unit: served_unit(WeatherVariable::Pressure { variable, level }),
            });
        };
        tracing::debug!(
            model = %self.domain.model,
            ?variable,
            level,
            lower,
            upper,
            "synthesizing missing pressure level"
        );
        let lo = self.fetch(
            WeatherVariable::Pressure {
                variable,
                level: lower,
            },
            range,
            ctx,
        )?;
        let hi = self.fetch(
            WeatherVariable::Pressure {
                variable,
                level: upper,
            },
            range,
            ctx,
        )?;

        let frac = (level - lower) as f32 / (upper - lower) as f32;
        let values = lo
            .values
            .iter()
            .zip(&hi.values)
            .map(|(&a, &b)| match variable {
                // Height varies with the logarithm of pressure, so blend in
                // pressure space instead of metre space.
                PressureVariable::GeopotentialHeight => {
                    let p_lo = atmosphere::pressure_from_height(a);
                    let p_hi = atmosphere::pressure_from_height(b);
                    atmosphere::height_from_pressure(p_lo + frac * (p_hi - p_lo))
                }
                PressureVariable::RelativeHumidity => (a + b) / 2.0,
                _ => a + frac * (b - a),
            })
            .collect();
        Ok(VariableSeries {
            values,
            unit: lo.unit,
        })
    }

    /// Read a stored series: splitter fetch, unit normalization, elevation
    /// correction.
    fn fetch_raw(
        &self,
        variable: WeatherVariable,
        range: TimerangeDt,
        ctx: &QueryContext,
    ) -> Result<VariableSeries> {
        ctx.check()?;
        let mut values = self
            .splitter
            .read(&variable.file_stem(), self.point.index, range)?;

        let mut unit = variable.unit();
        if unit == Unit::Pascal {
            for value in &mut values {
                *value /= 100.0;
            }
            unit = Unit::Hectopascal;
        }

        // A sea cell carries the sea sentinel, not a usable height; correcting
        // against it would shift the series by several kelvin.
        if variable.is_elevation_correctable()
            && unit.is_temperature()
            && !is_sea(self.point.grid_elevation)
            && self.target_elevation.is_finite()
        {
            let correction = (self.point.grid_elevation - self.target_elevation) * LAPSE_RATE;
            for value in &mut values {
                *value += correction;
            }
        }

        Ok(VariableSeries { values, unit })
    }
}
