//! Error types for point queries.

use forecast_common::{TimeError, Unit};
use thiserror::Error;

/// Errors that can occur while answering a point query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Storage-level failure.
    #[error(transparent)]
    Store(#[from] series_store::StoreError),

    /// The query deadline was exceeded; no partial results are returned.
    #[error("query deadline exceeded")]
    Cancelled,

    /// No grid point exists for the requested coordinate.
    #[error("no data available for latitude {latitude}, longitude {longitude}")]
    GridMiss { latitude: f64, longitude: f64 },

    /// Two domains answered the same variable in different units.
    #[error("unit mismatch across domains: {expected} vs {actual}")]
    UnitMismatch { expected: Unit, actual: Unit },

    /// The query step is coarser than, or does not evenly divide, the domain
    /// step. Aggregation is not interpolation.
    #[error("cannot resample domain step {domain_dt}s to query step {query_dt}s")]
    UpsamplingForbidden { query_dt: i64, domain_dt: i64 },

    /// A time range was malformed.
    #[error(transparent)]
    Time(#[from] TimeError),
}

/// Result type for point queries.
pub type Result<T> = std::result::Result<T, QueryError>;
