//! Point-oriented variable access over the column store.
//!
//! A [`PointReader`] binds one model domain to one grid point and answers
//! variable queries: it routes through the splitter, synthesizes missing
//! pressure levels, derives inputs a domain lacks, applies elevation
//! correction, and resamples in time. A [`DomainMixer`] stacks readers from
//! several overlapping domains — coarse global first, fine regional last —
//! and returns the highest-resolution non-missing value per timestep.

pub mod atmosphere;
pub mod context;
pub mod derive;
pub mod domain;
pub mod error;
pub mod interpolate;
pub mod mixer;
pub mod reader;
pub mod solar;

pub use context::QueryContext;
pub use domain::Domain;
pub use error::{QueryError, Result};
pub use mixer::DomainMixer;
pub use reader::{PointReader, VariableSeries};
