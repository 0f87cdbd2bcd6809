//! Synthetic series generators with predictable, verifiable values.

/// The canonical test ramp: `location + step / 24`.
///
/// Distinct per location, slowly increasing in time, and exactly
/// representable after int16 quantization with scalefactor 20 or more.
pub fn ramp_value(location: usize, step: i64) -> f32 {
    location as f32 + step as f32 / 24.0
}

/// A location-major series filled with one value.
pub fn constant_series(n_locations: usize, n_steps: usize, value: f32) -> Vec<f32> {
    vec![value; n_locations * n_steps]
}

/// A location-major ramp series with NaN holes at the given
/// `(location, step)` cells.
pub fn series_with_nans(
    n_locations: usize,
    n_steps: usize,
    holes: &[(usize, usize)],
) -> Vec<f32> {
    let mut values = Vec::with_capacity(n_locations * n_steps);
    for location in 0..n_locations {
        for step in 0..n_steps {
            if holes.contains(&(location, step)) {
                values.push(f32::NAN);
            } else {
                values.push(ramp_value(location, step as i64));
            }
        }
    }
    values
}
