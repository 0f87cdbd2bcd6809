//! Derivation formulas for inputs a domain does not store.
//!
//! Pure functions fed by the reader: cloud cover from relative humidity and
//! diffuse shortwave from global shortwave. Missing inputs stay missing.

use crate::solar;
use forecast_common::{TimerangeDt, Timestamp};

/// Cloud fraction from relative humidity, Sundqvist et al. (1989).
///
/// Zero below the critical humidity, saturating towards 100% as humidity
/// approaches saturation.
pub fn cloud_cover_from_relative_humidity(rh_percent: f32) -> f32 {
    const RH_CRIT: f32 = 0.7;
    if !rh_percent.is_finite() {
        return f32::NAN;
    }
    let rh = (rh_percent / 100.0).clamp(0.0, 1.0);
    if rh <= RH_CRIT {
        return 0.0;
    }
    let cover = 1.0 - ((1.0 - rh) / (1.0 - RH_CRIT)).sqrt();
    (cover * 100.0).clamp(0.0, 100.0)
}

/// Diffuse fraction of global shortwave, Erbs et al. (1982).
fn diffuse_fraction(kt: f32) -> f32 {
    if kt <= 0.22 {
        1.0 - 0.09 * kt
    } else if kt <= 0.8 {
        0.9511 - 0.1604 * kt + 4.388 * kt.powi(2) - 16.638 * kt.powi(3) + 12.336 * kt.powi(4)
    } else {
        0.165
    }
}

/// Diffuse shortwave from backwards-averaged global shortwave.
///
/// The clearness index of each interval selects the diffuse fraction; dark
/// intervals are fully diffuse by convention (the value is ~0 anyway).
pub fn diffuse_from_shortwave(
    shortwave: &[f32],
    range: &TimerangeDt,
    latitude: f64,
    longitude: f64,
) -> Vec<f32> {
    const MIN_ETR: f64 = 1e-3;
    range
        .iter()
        .zip(shortwave)
        .map(|(t, &sw)| {
            if !sw.is_finite() {
                return f32::NAN;
            }
            let etr = solar::average_extraterrestrial(
                Timestamp(t.0 - range.dt_seconds),
                t,
                latitude,
                longitude,
            );
            if etr < MIN_ETR {
                return sw.max(0.0);
            }
            let kt = (sw as f64 / etr) as f32;
            (sw * diffuse_fraction(kt.clamp(0.0, 1.0))).max(0.0)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_cover_dry_air_is_clear() {
        assert_eq!(cloud_cover_from_relative_humidity(0.0), 0.0);
        assert_eq!(cloud_cover_from_relative_humidity(50.0), 0.0);
        assert_eq!(cloud_cover_from_relative_humidity(70.0), 0.0);
    }

    #[test]
    fn test_cloud_cover_saturated_air_is_overcast() {
        assert_eq!(cloud_cover_from_relative_humidity(100.0), 100.0);
        let at_90 = cloud_cover_from_relative_humidity(90.0);
        assert!(at_90 > 30.0 && at_90 < 60.0, "got {}", at_90);
    }

    #[test]
    fn test_cloud_cover_monotone() {
        let mut previous = -1.0;
        for rh in (0..=100).step_by(5) {
            let cover = cloud_cover_from_relative_humidity(rh as f32);
            assert!(cover >= previous);
            previous = cover;
        }
    }

    #[test]
    fn test_cloud_cover_nan() {
        assert!(cloud_cover_from_relative_humidity(f32::NAN).is_nan());
    }

    #[test]
    fn test_diffuse_fraction_shape() {
        // Overcast skies are all diffuse, clear skies mostly direct.
        assert!(diffuse_fraction(0.1) > 0.95);
        assert!(diffuse_fraction(0.9) < 0.2);
        // The piecewise pieces meet without a wild jump at 0.22.
        let below = diffuse_fraction(0.2199);
        let above = diffuse_fraction(0.2201);
        assert!((below - above).abs() < 0.05);
    }

    #[test]
    fn test_diffuse_from_shortwave() {
        let day = 171 * 86_400;
        let range = TimerangeDt::new(
            Timestamp(day + 10 * 3600),
            Timestamp(day + 14 * 3600),
            3600,
        )
        .unwrap();
        // Midday at the equator: clear-sky-ish values give a small diffuse
        // share, overcast values stay fully diffuse.
        let clear = vec![900.0f32; 4];
        let clear_diffuse = diffuse_from_shortwave(&clear, &range, 0.0, 0.0);
        assert!(clear_diffuse.iter().all(|d| *d < 400.0 && *d > 0.0));

        let overcast = vec![80.0f32; 4];
        let overcast_diffuse = diffuse_from_shortwave(&overcast, &range, 0.0, 0.0);
        for (d, sw) in overcast_diffuse.iter().zip(&overcast) {
            assert!((d / sw) > 0.9);
        }
    }

    #[test]
    fn test_diffuse_nan_propagates() {
        let range = TimerangeDt::new(Timestamp(0), Timestamp(2 * 3600), 3600).unwrap();
        let out = diffuse_from_shortwave(&[f32::NAN, 100.0], &range, 0.0, 0.0);
        assert!(out[0].is_nan());
        assert!(!out[1].is_nan());
    }
}
