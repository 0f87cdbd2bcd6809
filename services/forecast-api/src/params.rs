//! Query parameters: parsing, validation, output unit conversion.

use chrono::NaiveDate;
use forecast_common::{TimerangeDt, Timestamp, Unit, WeatherVariable};
use serde::Deserialize;
use thiserror::Error;

const SECONDS_PER_DAY: i64 = 86_400;
const MAX_FORECAST_DAYS: i64 = 16;
const DEFAULT_FORECAST_DAYS: i64 = 7;

/// Raw query string of `GET /{model}`.
#[derive(Debug, Deserialize, Default)]
pub struct ForecastParams {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f32>,
    /// Comma-separated hourly variable names.
    pub hourly: Option<String>,
    /// Comma-separated daily aggregate names; requires `timezone`.
    pub daily: Option<String>,
    pub timezone: Option<String>,
    /// `YYYY-MM-DD`, local to `timezone`.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub forecast_days: Option<i64>,
    pub past_days: Option<i64>,
    #[serde(default)]
    pub current_weather: bool,
    #[serde(default)]
    pub temperature_unit: TemperatureUnit,
    #[serde(default)]
    pub windspeed_unit: WindSpeedUnit,
    #[serde(default)]
    pub precipitation_unit: PrecipitationUnit,
    #[serde(default)]
    pub timeformat: TimeFormat,
    #[serde(default)]
    pub format: ResponseFormat,
}

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("parameter '{0}' is required")]
    Missing(&'static str),

    #[error("latitude must be within [-90, 90], got {0}")]
    LatitudeOutOfRange(f64),

    #[error("longitude must be within [-180, 180], got {0}")]
    LongitudeOutOfRange(f64),

    #[error("forecast_days must be within (0, {MAX_FORECAST_DAYS}], got {0}")]
    ForecastDaysOutOfRange(i64),

    #[error("past_days must be non-negative, got {0}")]
    PastDaysNegative(i64),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown daily aggregate '{0}'")]
    UnknownDailyAggregate(String),

    #[error("daily aggregates require the 'timezone' parameter")]
    DailyWithoutTimezone,

    #[error("unsupported timezone '{0}' (use GMT or a fixed ±HH:MM offset)")]
    UnsupportedTimezone(String),

    #[error("invalid date '{0}' (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("end_date precedes start_date")]
    EndBeforeStart,
}

/// A validated forecast request.
#[derive(Debug)]
pub struct ForecastRequest {
    pub latitude: f64,
    pub longitude: f64,
    /// NaN when the caller did not supply an elevation.
    pub elevation: f32,
    pub hourly: Vec<WeatherVariable>,
    pub daily: Vec<DailyAggregate>,
    pub utc_offset_seconds: i64,
    /// Hourly query window.
    pub range: TimerangeDt,
    pub current_weather: bool,
    pub temperature_unit: TemperatureUnit,
    pub windspeed_unit: WindSpeedUnit,
    pub precipitation_unit: PrecipitationUnit,
    pub timeformat: TimeFormat,
    pub format: ResponseFormat,
}

impl ForecastParams {
    /// Validate against `now` and produce the concrete request.
    pub fn validate(self, now: Timestamp) -> Result<ForecastRequest, ParamError> {
        let latitude = self.latitude.ok_or(ParamError::Missing("latitude"))?;
        let longitude = self.longitude.ok_or(ParamError::Missing("longitude"))?;
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ParamError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ParamError::LongitudeOutOfRange(longitude));
        }

        let hourly = match &self.hourly {
            None => Vec::new(),
            Some(list) => list
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|name| {
                    WeatherVariable::parse(name.trim())
                        .ok_or_else(|| ParamError::UnknownVariable(name.trim().to_string()))
                })
                .collect::<Result<_, _>>()?,
        };

        let daily = match &self.daily {
            None => Vec::new(),
            Some(list) => list
                .split(',')
                .filter(|s| !s.is_empty())
                .map(|name| DailyAggregate::parse(name.trim()))
                .collect::<Result<_, _>>()?,
        };
        if !daily.is_empty() && self.timezone.is_none() {
            return Err(ParamError::DailyWithoutTimezone);
        }

        let utc_offset_seconds = match &self.timezone {
            None => 0,
            Some(tz) => parse_timezone(tz)?,
        };

        let forecast_days = self.forecast_days.unwrap_or(DEFAULT_FORECAST_DAYS);
        if forecast_days <= 0 || forecast_days > MAX_FORECAST_DAYS {
            return Err(ParamError::ForecastDaysOutOfRange(forecast_days));
        }
        let past_days = self.past_days.unwrap_or(0);
        if past_days < 0 {
            return Err(ParamError::PastDaysNegative(past_days));
        }

        // Local midnight of today in the requested timezone.
        let today = Timestamp(
            (now.0 + utc_offset_seconds).div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY
                - utc_offset_seconds,
        );
        let (start, end) = match (&self.start_date, &self.end_date) {
            (Some(start_date), Some(end_date)) => {
                let start = local_midnight(start_date, utc_offset_seconds)?;
                let end = local_midnight(end_date, utc_offset_seconds)?;
                if end < start {
                    return Err(ParamError::EndBeforeStart);
                }
                (start, Timestamp(end.0 + SECONDS_PER_DAY))
            }
            _ => (
                Timestamp(today.0 - past_days * SECONDS_PER_DAY),
                Timestamp(today.0 + forecast_days * SECONDS_PER_DAY),
            ),
        };
        // Sub-hour offsets (e.g. +05:30) round the window outward to hour
        // boundaries; the series itself is always hourly.
        let range = TimerangeDt::new(start.floor(3600), end.ceil(3600), 3600)
            .expect("aligned by construction");

        Ok(ForecastRequest {
            latitude,
            longitude,
            elevation: self.elevation.unwrap_or(f32::NAN),
            hourly,
            daily,
            utc_offset_seconds,
            range,
            current_weather: self.current_weather,
            temperature_unit: self.temperature_unit,
            windspeed_unit: self.windspeed_unit,
            precipitation_unit: self.precipitation_unit,
            timeformat: self.timeformat,
            format: self.format,
        })
    }
}

/// UTC offset in seconds for a timezone parameter.
///
/// Supports `GMT`/`UTC`/`auto` and fixed `±HH:MM` offsets.
fn parse_timezone(tz: &str) -> Result<i64, ParamError> {
    match tz {
        "GMT" | "UTC" | "auto" => return Ok(0),
        _ => {}
    }
    let (sign, rest) = if let Some(rest) = tz.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = tz.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(ParamError::UnsupportedTimezone(tz.to_string()));
    };
    let Some((hours, minutes)) = rest.split_once(':') else {
        return Err(ParamError::UnsupportedTimezone(tz.to_string()));
    };
    match (hours.parse::<i64>(), minutes.parse::<i64>()) {
        (Ok(h), Ok(m)) if h <= 14 && m < 60 => Ok(sign * (h * 3600 + m * 60)),
        _ => Err(ParamError::UnsupportedTimezone(tz.to_string())),
    }
}

/// UTC instant of local midnight on a `YYYY-MM-DD` date.
fn local_midnight(date: &str, utc_offset_seconds: i64) -> Result<Timestamp, ParamError> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| ParamError::InvalidDate(date.to_string()))?;
    let midnight_utc = date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
    Ok(Timestamp(midnight_utc - utc_offset_seconds))
}

/// Supported daily aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyAggregate {
    Temperature2mMax,
    Temperature2mMin,
    PrecipitationSum,
}

impl DailyAggregate {
    pub fn parse(name: &str) -> Result<Self, ParamError> {
        match name {
            "temperature_2m_max" => Ok(Self::Temperature2mMax),
            "temperature_2m_min" => Ok(Self::Temperature2mMin),
            "precipitation_sum" => Ok(Self::PrecipitationSum),
            _ => Err(ParamError::UnknownDailyAggregate(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Temperature2mMax => "temperature_2m_max",
            Self::Temperature2mMin => "temperature_2m_min",
            Self::PrecipitationSum => "precipitation_sum",
        }
    }

    /// The hourly variable this aggregate reduces.
    pub fn source(&self) -> WeatherVariable {
        use forecast_common::SurfaceVariable;
        match self {
            Self::Temperature2mMax | Self::Temperature2mMin => {
                WeatherVariable::Surface(SurfaceVariable::Temperature2m)
            }
            Self::PrecipitationSum => WeatherVariable::Surface(SurfaceVariable::Precipitation),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindSpeedUnit {
    #[default]
    Kmh,
    Ms,
    Mph,
    Kn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecipitationUnit {
    #[default]
    Mm,
    Inch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    #[default]
    Iso8601,
    Unixtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    #[default]
    Json,
    Csv,
}

impl ForecastRequest {
    /// Convert one value from its stored unit into the requested output unit.
    pub fn convert(&self, value: f32, unit: Unit) -> (f32, Unit) {
        match unit {
            Unit::Celsius if self.temperature_unit == TemperatureUnit::Fahrenheit => {
                (value * 1.8 + 32.0, Unit::Fahrenheit)
            }
            Unit::MetresPerSecond => match self.windspeed_unit {
                WindSpeedUnit::Ms => (value, unit),
                WindSpeedUnit::Kmh => (value * 3.6, Unit::KilometresPerHour),
                WindSpeedUnit::Mph => (value * 2.236_936, Unit::MilesPerHour),
                WindSpeedUnit::Kn => (value * 1.943_844, Unit::Knots),
            },
            Unit::Millimetre if self.precipitation_unit == PrecipitationUnit::Inch => {
                (value / 25.4, Unit::Inch)
            }
            _ => (value, unit),
        }
    }

    /// Convert a whole series, returning the output unit.
    pub fn convert_series(&self, values: &mut [f32], unit: Unit) -> Unit {
        let (_, out_unit) = self.convert(0.0, unit);
        if out_unit != unit {
            for value in values.iter_mut() {
                (*value, _) = self.convert(*value, unit);
            }
        }
        out_unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2022-06-15T09:30:00Z
    const NOW: Timestamp = Timestamp(1_655_285_400);

    fn base() -> ForecastParams {
        ForecastParams {
            latitude: Some(47.5),
            longitude: Some(8.6),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_give_seven_days_from_midnight() {
        let request = base().validate(NOW).unwrap();
        // 2022-06-15T00:00:00Z
        assert_eq!(request.range.start, Timestamp(1_655_251_200));
        assert_eq!(request.range.count(), 7 * 24);
        assert_eq!(request.utc_offset_seconds, 0);
    }

    #[test]
    fn test_latitude_bounds() {
        let mut params = base();
        params.latitude = Some(91.0);
        assert!(matches!(
            params.validate(NOW),
            Err(ParamError::LatitudeOutOfRange(_))
        ));
    }

    #[test]
    fn test_missing_coordinates() {
        let params = ForecastParams::default();
        assert!(matches!(params.validate(NOW), Err(ParamError::Missing("latitude"))));
    }

    #[test]
    fn test_forecast_days_bounds() {
        for days in [0, -1, 17] {
            let mut params = base();
            params.forecast_days = Some(days);
            assert!(matches!(
                params.validate(NOW),
                Err(ParamError::ForecastDaysOutOfRange(_))
            ));
        }
        let mut params = base();
        params.forecast_days = Some(16);
        assert_eq!(params.validate(NOW).unwrap().range.count(), 16 * 24);
    }

    #[test]
    fn test_past_days_extend_backwards() {
        let mut params = base();
        params.past_days = Some(2);
        let request = params.validate(NOW).unwrap();
        assert_eq!(request.range.start, Timestamp(1_655_251_200 - 2 * 86_400));
        assert_eq!(request.range.count(), 9 * 24);
    }

    #[test]
    fn test_hourly_list_parses() {
        let mut params = base();
        params.hourly = Some("temperature_2m,precipitation, cloud_cover".to_string());
        let request = params.validate(NOW).unwrap();
        assert_eq!(request.hourly.len(), 3);

        let mut bad = base();
        bad.hourly = Some("temperature_2m,bogus".to_string());
        assert!(matches!(bad.validate(NOW), Err(ParamError::UnknownVariable(_))));
    }

    #[test]
    fn test_daily_requires_timezone() {
        let mut params = base();
        params.daily = Some("temperature_2m_max".to_string());
        assert!(matches!(
            params.validate(NOW),
            Err(ParamError::DailyWithoutTimezone)
        ));

        let mut with_tz = base();
        with_tz.daily = Some("temperature_2m_max".to_string());
        with_tz.timezone = Some("GMT".to_string());
        assert!(with_tz.validate(NOW).is_ok());
    }

    #[test]
    fn test_fixed_offset_timezone_shifts_midnight() {
        let mut params = base();
        params.timezone = Some("+02:00".to_string());
        let request = params.validate(NOW).unwrap();
        assert_eq!(request.utc_offset_seconds, 7200);
        // Local midnight 2022-06-15T00:00+02:00 is 2022-06-14T22:00Z.
        assert_eq!(request.range.start, Timestamp(1_655_251_200 - 7200));
    }

    #[test]
    fn test_unsupported_timezone() {
        let mut params = base();
        params.timezone = Some("Europe/Berlin".to_string());
        assert!(matches!(
            params.validate(NOW),
            Err(ParamError::UnsupportedTimezone(_))
        ));
    }

    #[test]
    fn test_explicit_dates() {
        let mut params = base();
        params.start_date = Some("2022-06-10".to_string());
        params.end_date = Some("2022-06-12".to_string());
        let request = params.validate(NOW).unwrap();
        assert_eq!(request.range.count(), 3 * 24);

        let mut swapped = base();
        swapped.start_date = Some("2022-06-12".to_string());
        swapped.end_date = Some("2022-06-10".to_string());
        assert!(matches!(swapped.validate(NOW), Err(ParamError::EndBeforeStart)));
    }

    #[test]
    fn test_unit_conversions() {
        let mut params = base();
        params.temperature_unit = TemperatureUnit::Fahrenheit;
        params.windspeed_unit = WindSpeedUnit::Kmh;
        params.precipitation_unit = PrecipitationUnit::Inch;
        let request = params.validate(NOW).unwrap();

        let (f, unit) = request.convert(20.0, Unit::Celsius);
        assert!((f - 68.0).abs() < 1e-4);
        assert_eq!(unit, Unit::Fahrenheit);

        let (kmh, unit) = request.convert(10.0, Unit::MetresPerSecond);
        assert!((kmh - 36.0).abs() < 1e-4);
        assert_eq!(unit, Unit::KilometresPerHour);

        let (inch, unit) = request.convert(25.4, Unit::Millimetre);
        assert!((inch - 1.0).abs() < 1e-4);
        assert_eq!(unit, Unit::Inch);

        // Units without a requested conversion pass through.
        let (same, unit) = request.convert(55.0, Unit::Percent);
        assert_eq!(same, 55.0);
        assert_eq!(unit, Unit::Percent);
    }
}
