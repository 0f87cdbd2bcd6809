//! Shared application state.

use crate::config::RegistryConfig;
use point_query::Domain;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Immutable per-process state: the model registry.
pub struct AppState {
    /// Model name → domain stack, coarse global first.
    registry: HashMap<String, Vec<Arc<Domain>>>,
}

impl AppState {
    /// Build the registry from a config file.
    pub fn from_config_file(path: &Path) -> anyhow::Result<Self> {
        let config = RegistryConfig::from_file(path)?;
        Ok(Self::from_config(config))
    }

    pub fn from_config(config: RegistryConfig) -> Self {
        let mut registry = HashMap::new();
        for model in &config.models {
            let domains: Vec<Arc<Domain>> =
                model.domains.iter().map(|d| Arc::new(d.build())).collect();
            info!(model = %model.name, domains = domains.len(), "model registered");
            registry.insert(model.name.clone(), domains);
        }
        Self { registry }
    }

    /// Domain stack for a model, or `None` for unknown models.
    pub fn domains(&self, model: &str) -> Option<&[Arc<Domain>]> {
        self.registry.get(model).map(|d| d.as_slice())
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.registry.keys().map(|s| s.as_str()).collect()
    }
}
