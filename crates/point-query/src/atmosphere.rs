//! ICAO standard atmosphere.
//!
//! Used to interpolate geopotential height in pressure space when a model
//! lacks a requested isobaric level.

/// Sea-level pressure in hPa.
const P0: f32 = 1013.25;
/// Sea-level temperature in K.
const T0: f32 = 288.15;
/// Tropospheric lapse rate in K/m.
const LAPSE: f32 = 0.0065;
/// Barometric exponent `g·M / (R·L)`.
const EXPONENT: f32 = 5.255;

/// Pressure in hPa at geometric height `h` metres.
pub fn pressure_from_height(h: f32) -> f32 {
    P0 * (1.0 - LAPSE * h / T0).powf(EXPONENT)
}

/// Geometric height in metres at pressure `p` hPa.
pub fn height_from_pressure(p: f32) -> f32 {
    T0 / LAPSE * (1.0 - (p / P0).powf(1.0 / EXPONENT))
}
