//! Multi-domain overlay for one query point.

use crate::context::QueryContext;
use crate::domain::Domain;
use crate::error::{QueryError, Result};
use crate::reader::{served_unit, PointReader, VariableSeries};
use forecast_common::{TimerangeDt, WeatherVariable};
use met_grid::SelectionMode;
use std::sync::Arc;

/// An ordered stack of per-domain readers, coarse global first and fine
/// regional last.
///
/// For every timestep the mixer keeps the last finite value in stack order,
/// so the highest-resolution domain covering the point wins and lower
/// resolution fills its gaps.
pub struct DomainMixer {
    readers: Vec<PointReader>,
}

impl DomainMixer {
    /// Build from readers already bound to a point, lowest resolution first.
    pub fn new(readers: Vec<PointReader>) -> Self {
        Self { readers }
    }

    /// Bind a domain stack to a query coordinate, skipping domains whose
    /// grids do not contain the point.
    pub fn for_point(
        domains: &[Arc<Domain>],
        latitude: f64,
        longitude: f64,
        elevation: f32,
        mode: SelectionMode,
    ) -> Result<Self> {
        let readers: Vec<PointReader> = domains
            .iter()
            .filter_map(|domain| {
                PointReader::new(Arc::clone(domain), latitude, longitude, elevation, mode)
            })
            .collect();
        if readers.is_empty() {
            return Err(QueryError::GridMiss {
                latitude,
                longitude,
            });
        }
        Ok(Self::new(readers))
    }

    pub fn readers(&self) -> &[PointReader] {
        &self.readers
    }

    /// Fan a prefetch out to every underlying reader.
    pub fn prefetch(&self, variable: WeatherVariable, range: TimerangeDt) {
        for reader in &self.readers {
            if reader.supports(variable) {
                reader.prefetch(variable, range);
            }
        }
    }

    /// Position-wise reduction over the domain stack.
    pub fn get(
        &self,
        variable: WeatherVariable,
        range: TimerangeDt,
        ctx: &QueryContext,
    ) -> Result<VariableSeries> {
        let mut out = vec![f32::NAN; range.count()];
        let mut unit = None;

        for reader in &self.readers {
            if !reader.supports(variable) {
                continue;
            }
            let series = reader.get(variable, range, ctx)?;

            if series.values.iter().any(|v| v.is_finite()) {
                match unit {
                    None => unit = Some(series.unit),
                    Some(expected) if expected != series.unit => {
                        return Err(QueryError::UnitMismatch {
                            expected,
                            actual: series.unit,
                        });
                    }
                    Some(_) => {}
                }
            }

            for (slot, value) in out.iter_mut().zip(series.values) {
                if value.is_finite() {
                    *slot = value;
                }
            }
        }

        Ok(VariableSeries {
            values: out,
            unit: unit.unwrap_or_else(|| served_unit(variable)),
        })
    }
}
