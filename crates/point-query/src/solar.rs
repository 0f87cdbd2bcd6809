//! Extra-terrestrial solar radiation over arbitrary intervals.
//!
//! The solar-backwards-averaged interpolation kernel needs the mean
//! top-of-atmosphere irradiance over both the source and destination
//! averaging intervals. The integral of the cosine of the solar zenith angle
//! over an hour-angle window has a closed form, clipped to the daylight
//! portion of the day.

use forecast_common::Timestamp;
use std::f64::consts::PI;

/// Solar constant in W/m².
const SOLAR_CONSTANT: f64 = 1367.0;

/// Solar declination in radians for a fractional day of year (Cooper 1969).
fn declination(day_of_year: f64) -> f64 {
    23.45_f64.to_radians() * (2.0 * PI * (284.0 + day_of_year) / 365.0).sin()
}

/// Eccentricity correction of the Earth-Sun distance.
fn eccentricity(day_of_year: f64) -> f64 {
    1.0 + 0.033 * (2.0 * PI * day_of_year / 365.0).cos()
}

/// Fractional UTC day of year (1-based) for a timestamp.
fn fractional_day_of_year(t: Timestamp) -> f64 {
    const SECONDS_PER_DAY: i64 = 86_400;
    const SECONDS_PER_YEAR: i64 = 365 * SECONDS_PER_DAY;
    let second_of_year = t.0.rem_euclid(SECONDS_PER_YEAR);
    1.0 + second_of_year as f64 / SECONDS_PER_DAY as f64
}

/// Hour angle in radians at `t` for a longitude, continuous over days.
fn hour_angle(t: Timestamp, longitude: f64) -> f64 {
    let solar_seconds = t.0 as f64 + longitude / 15.0 * 3600.0;
    (solar_seconds / 3600.0 - 12.0) * PI / 12.0
}

/// Integral of `cos(zenith)` over an hour-angle window inside one solar day,
/// clipped to daylight `[-sunset, sunset]`.
fn daylight_integral(a: f64, b: f64, sunset: f64, cc: f64, ss: f64) -> f64 {
    let lo = a.max(-sunset);
    let hi = b.min(sunset);
    if hi <= lo {
        return 0.0;
    }
    ss * (hi - lo) + cc * (hi.sin() - lo.sin())
}

/// Mean extra-terrestrial irradiance in W/m² over `[start, end)` at a point.
///
/// Night portions of the interval contribute zero; a polar-night interval
/// averages to exactly zero.
pub fn average_extraterrestrial(
    start: Timestamp,
    end: Timestamp,
    latitude: f64,
    longitude: f64,
) -> f64 {
    if end.0 <= start.0 {
        return 0.0;
    }
    let midpoint = Timestamp((start.0 + end.0) / 2);
    let n = fractional_day_of_year(midpoint);
    let decl = declination(n);
    let lat = latitude.to_radians();

    let cc = lat.cos() * decl.cos();
    let ss = lat.sin() * decl.sin();

    // Sunset hour angle; clamp covers polar day and polar night.
    let cos_sunset = -lat.tan() * decl.tan();
    let sunset = cos_sunset.clamp(-1.0, 1.0).acos();

    let w1 = hour_angle(start, longitude);
    let w2 = hour_angle(end, longitude);

    // Shift the window so it starts inside [-PI, PI), then split at the solar
    // midnight boundary if it runs past PI.
    let wrapped = (w1 + PI).rem_euclid(2.0 * PI) - PI;
    let shift = wrapped - w1;
    let (a, b) = (w1 + shift, w2 + shift);

    let mut integral = daylight_integral(a, b.min(PI), sunset, cc, ss);
    if b > PI {
        integral += daylight_integral(-PI, b - 2.0 * PI, sunset, cc, ss);
    }

    (SOLAR_CONSTANT * eccentricity(n) * integral / (b - a)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1970-06-21 (southern-hemisphere winter references use December below).
    const JUNE_21_NOON_UTC: i64 = 171 * 86_400 + 12 * 3600;
    const DEC_21_NOON_UTC: i64 = 354 * 86_400 + 12 * 3600;

    #[test]
    fn test_equator_noon_is_strong() {
        let avg = average_extraterrestrial(
            Timestamp(JUNE_21_NOON_UTC - 1800),
            Timestamp(JUNE_21_NOON_UTC + 1800),
            0.0,
            0.0,
        );
        assert!(avg > 1100.0, "got {}", avg);
    }

    #[test]
    fn test_midnight_is_zero() {
        let midnight = JUNE_21_NOON_UTC + 12 * 3600;
        let avg = average_extraterrestrial(
            Timestamp(midnight - 1800),
            Timestamp(midnight + 1800),
            0.0,
            0.0,
        );
        assert_eq!(avg, 0.0);
    }

    #[test]
    fn test_polar_night_is_zero() {
        // North pole around the December solstice.
        let avg = average_extraterrestrial(
            Timestamp(DEC_21_NOON_UTC),
            Timestamp(DEC_21_NOON_UTC + 6 * 3600),
            89.0,
            0.0,
        );
        assert_eq!(avg, 0.0);
    }

    #[test]
    fn test_polar_day_is_continuous() {
        // North pole around the June solstice: sun never sets, so even the
        // local-midnight interval is positive.
        let midnight = JUNE_21_NOON_UTC + 12 * 3600;
        let avg = average_extraterrestrial(
            Timestamp(midnight - 3600),
            Timestamp(midnight + 3600),
            85.0,
            0.0,
        );
        assert!(avg > 0.0);
    }

    #[test]
    fn test_longitude_shifts_solar_noon() {
        // Solar noon at 90°E happens at 06:00 UTC.
        let at_6utc = average_extraterrestrial(
            Timestamp(JUNE_21_NOON_UTC - 6 * 3600 - 1800),
            Timestamp(JUNE_21_NOON_UTC - 6 * 3600 + 1800),
            0.0,
            90.0,
        );
        // ... and solar midnight at 18:00 UTC.
        let at_18utc = average_extraterrestrial(
            Timestamp(JUNE_21_NOON_UTC + 6 * 3600 - 1800),
            Timestamp(JUNE_21_NOON_UTC + 6 * 3600 + 1800),
            0.0,
            90.0,
        );
        assert!(at_6utc > 1100.0);
        assert_eq!(at_18utc, 0.0);
    }

    #[test]
    fn test_daily_average_matches_subinterval_sum() {
        // The 24 h average must equal the mean of the 24 hourly averages.
        let day_start = Timestamp(JUNE_21_NOON_UTC - 12 * 3600);
        let whole = average_extraterrestrial(
            day_start,
            Timestamp(day_start.0 + 86_400),
            45.0,
            10.0,
        );
        let hourly_mean: f64 = (0..24)
            .map(|h| {
                average_extraterrestrial(
                    Timestamp(day_start.0 + h * 3600),
                    Timestamp(day_start.0 + (h + 1) * 3600),
                    45.0,
                    10.0,
                )
            })
            .sum::<f64>()
            / 24.0;
        assert!((whole - hourly_mean).abs() < 1.0, "{} vs {}", whole, hourly_mean);
    }
}
