//! Companion elevation map for a model grid.
//!
//! Stored as a single-timestep column file at `<domainRoot>/elevation.om`:
//! one f32 surface height per grid point, with a sentinel marking open water.

use crate::error::Result;
use om_file::{write, ColumnFile, ColumnFileLayout};
use std::ops::Range;
use std::path::Path;

/// Elevation value marking open water.
pub const SEA_SENTINEL: f32 = -999.0;

/// Whether an elevation value marks open water (or is unusable).
pub fn is_sea(elevation: f32) -> bool {
    !elevation.is_finite() || (elevation - SEA_SENTINEL).abs() < 0.5
}

/// Read handle over a grid's elevation file.
#[derive(Debug)]
pub struct ElevationMap {
    file: ColumnFile,
}

impl ElevationMap {
    /// Open `<domain_root>/elevation.om`.
    pub fn open(domain_root: impl AsRef<Path>) -> Result<Self> {
        let file = ColumnFile::open(domain_root.as_ref().join("elevation.om"))?;
        Ok(Self { file })
    }

    /// Number of grid points covered by the map.
    pub fn count(&self) -> usize {
        self.file.layout().n_locations
    }

    /// Elevation of one grid point; NaN when the point is missing.
    pub fn elevation(&self, index: usize) -> f32 {
        match self.file.read(index, 0..1) {
            Ok(values) => values[0],
            Err(_) => f32::NAN,
        }
    }

    /// Write an elevation file for `values.len()` grid points.
    ///
    /// Heights are stored at 1 m resolution, which is ample for lapse-rate
    /// correction.
    pub fn write(domain_root: impl AsRef<Path>, values: &[f32]) -> Result<()> {
        let layout = ColumnFileLayout {
            n_locations: values.len(),
            n_time: 1,
            chunk_loc: ColumnFileLayout::DEFAULT_CHUNK_LOC.min(values.len()),
            chunk_time: 1,
            scalefactor: 1.0,
        };
        let path = domain_root.as_ref().join("elevation.om");
        write(&path, &layout, &mut |locations: Range<usize>,
                                    _steps: Range<usize>| {
            values[locations].to_vec()
        })?;
        Ok(())
    }
}
