//! Point-forecast HTTP API.
//!
//! `GET /{model}` resolves a model name to its domain stack, binds a mixer to
//! the query coordinate, and returns interpolated hourly series (plus simple
//! daily aggregates and a current-weather snapshot) as JSON or CSV. The
//! storage core stays synchronous; handlers push it onto the blocking pool.

pub mod config;
pub mod handlers;
pub mod params;
pub mod state;
