//! Domain registry configuration.
//!
//! The service loads a JSON registry describing each servable model and its
//! domain stack (coarse global first, fine regional last).

use forecast_common::{PressureVariable, SurfaceVariable};
use met_grid::{ElevationMap, Grid};
use point_query::Domain;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level registry file.
#[derive(Debug, Deserialize)]
pub struct RegistryConfig {
    pub models: Vec<ModelConfig>,
}

/// One servable model: the URL path segment plus its domain stack.
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub domains: Vec<DomainConfig>,
}

/// One NWP domain backing a model.
#[derive(Debug, Deserialize)]
pub struct DomainConfig {
    pub model: String,
    pub grid: Grid,
    pub dt_seconds: i64,
    pub om_file_length: usize,
    /// Domain root: rolling column files and the optional `elevation.om`.
    pub directory: PathBuf,
    #[serde(default)]
    pub archive_directory: Option<PathBuf>,
    pub surface_variables: Vec<SurfaceVariable>,
    #[serde(default)]
    pub pressure_variables: Vec<PressureVariable>,
    #[serde(default)]
    pub pressure_levels: Vec<i32>,
    #[serde(default)]
    pub derives_pressure_cloud_cover: bool,
    #[serde(default)]
    pub derives_diffuse_radiation: bool,
}

impl RegistryConfig {
    /// Load and validate a registry file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the structural invariants of the registry.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.models.is_empty() {
            anyhow::bail!("registry declares no models");
        }
        for model in &self.models {
            if model.domains.is_empty() {
                anyhow::bail!("model {} declares no domains", model.name);
            }
            for domain in &model.domains {
                if domain.dt_seconds <= 0 {
                    anyhow::bail!("domain {} has non-positive step", domain.model);
                }
                if domain.om_file_length == 0 {
                    anyhow::bail!("domain {} has zero shard length", domain.model);
                }
            }
        }
        Ok(())
    }
}

impl DomainConfig {
    /// Materialize the runtime domain, picking up an elevation map when the
    /// domain root has one.
    pub fn build(&self) -> Domain {
        Domain {
            model: self.model.clone(),
            grid: self.grid.clone(),
            elevation: ElevationMap::open(&self.directory).ok(),
            dt_seconds: self.dt_seconds,
            om_file_length: self.om_file_length,
            directory: self.directory.clone(),
            archive_directory: self.archive_directory.clone(),
            surface_variables: self.surface_variables.clone(),
            pressure_variables: self.pressure_variables.clone(),
            pressure_levels: self.pressure_levels.clone(),
            derives_pressure_cloud_cover: self.derives_pressure_cloud_cover,
            derives_diffuse_radiation: self.derives_diffuse_radiation,
        }
    }
}
