//! Shared vocabulary for the forecast backend.
//!
//! Everything here is plain data: timestamps and aligned time ranges, physical
//! units, and the weather-variable descriptors (scalefactor, interpolation
//! kind, capability flags) that the storage and query layers consult.

pub mod time;
pub mod unit;
pub mod variable;

pub use time::{TimeError, TimerangeDt, Timestamp};
pub use unit::Unit;
pub use variable::{
    InterpolationKind, PressureVariable, SurfaceVariable, VariableCapabilities, WeatherVariable,
};
