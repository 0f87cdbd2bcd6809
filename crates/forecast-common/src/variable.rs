//! Weather-variable descriptors.
//!
//! A [`WeatherVariable`] names one stored series and carries everything the
//! storage and query layers need to handle it: the file-name stem, the
//! quantization scalefactor, the temporal interpolation kind, the SI unit, and
//! a small capability table. The capability table replaces per-model special
//! casing: the reader consults it instead of dispatching on concrete domain
//! types.

use crate::unit::Unit;
use serde::{Deserialize, Serialize};

/// Temporal interpolation behavior of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationKind {
    /// Straight line between neighboring steps.
    Linear,
    /// Catmull-Rom through four samples, optionally clamped to bounds.
    Hermite { bounds: Option<(f32, f32)> },
    /// The stored value is the mean irradiance over the trailing step
    /// interval; resampling must deaverage against the clear-sky profile.
    SolarBackwardsAveraged,
}

impl InterpolationKind {
    /// Extra source steps required on each side of the query window.
    pub fn padding(&self) -> usize {
        match self {
            Self::Linear => 1,
            Self::Hermite { .. } => 2,
            Self::SolarBackwardsAveraged => 2,
        }
    }
}

/// Per-variable capability flags consulted by the reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VariableCapabilities {
    /// Missing pressure levels may be synthesized from bracketing levels.
    pub can_interpolate_pressure: bool,
    /// May be derived from relative humidity when a domain lacks it.
    pub derives_cloud_cover_from_rh: bool,
    /// May be derived from global shortwave via a separation model.
    pub derives_diffuse_from_shortwave: bool,
}

/// Surface-level variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceVariable {
    #[serde(rename = "temperature_2m")]
    Temperature2m,
    #[serde(rename = "relative_humidity_2m")]
    RelativeHumidity2m,
    Precipitation,
    CloudCover,
    PressureMsl,
    #[serde(rename = "wind_speed_10m")]
    WindSpeed10m,
    #[serde(rename = "wind_direction_10m")]
    WindDirection10m,
    ShortwaveRadiation,
    DiffuseRadiation,
}

/// Variables defined on isobaric levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureVariable {
    Temperature,
    RelativeHumidity,
    GeopotentialHeight,
    CloudCover,
}

/// One stored series: either a surface variable or a pressure-level variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeatherVariable {
    Surface(SurfaceVariable),
    Pressure {
        variable: PressureVariable,
        /// Level in hPa.
        level: i32,
    },
}

impl WeatherVariable {
    /// The file-name stem used for column files, e.g. `temperature_2m` or
    /// `temperature_850hPa`.
    pub fn file_stem(&self) -> String {
        match self {
            Self::Surface(v) => v.stem().to_string(),
            Self::Pressure { variable, level } => format!("{}_{}hPa", variable.stem(), level),
        }
    }

    /// Multiplier applied before quantizing to int16 on disk.
    pub fn scalefactor(&self) -> f32 {
        match self {
            Self::Surface(v) => match v {
                SurfaceVariable::Temperature2m => 20.0,
                SurfaceVariable::RelativeHumidity2m => 1.0,
                SurfaceVariable::Precipitation => 10.0,
                SurfaceVariable::CloudCover => 1.0,
                SurfaceVariable::PressureMsl => 0.1,
                SurfaceVariable::WindSpeed10m => 10.0,
                SurfaceVariable::WindDirection10m => 0.5,
                SurfaceVariable::ShortwaveRadiation => 1.0,
                SurfaceVariable::DiffuseRadiation => 1.0,
            },
            Self::Pressure { variable, .. } => match variable {
                PressureVariable::Temperature => 20.0,
                PressureVariable::RelativeHumidity => 1.0,
                PressureVariable::GeopotentialHeight => 1.0,
                PressureVariable::CloudCover => 1.0,
            },
        }
    }

    /// Unit of the stored values.
    pub fn unit(&self) -> Unit {
        match self {
            Self::Surface(v) => match v {
                SurfaceVariable::Temperature2m => Unit::Celsius,
                SurfaceVariable::RelativeHumidity2m => Unit::Percent,
                SurfaceVariable::Precipitation => Unit::Millimetre,
                SurfaceVariable::CloudCover => Unit::Percent,
                SurfaceVariable::PressureMsl => Unit::Pascal,
                SurfaceVariable::WindSpeed10m => Unit::MetresPerSecond,
                SurfaceVariable::WindDirection10m => Unit::Degree,
                SurfaceVariable::ShortwaveRadiation => Unit::WattPerSquareMetre,
                SurfaceVariable::DiffuseRadiation => Unit::WattPerSquareMetre,
            },
            Self::Pressure { variable, .. } => match variable {
                PressureVariable::Temperature => Unit::Celsius,
                PressureVariable::RelativeHumidity => Unit::Percent,
                PressureVariable::GeopotentialHeight => Unit::Metre,
                PressureVariable::CloudCover => Unit::Percent,
            },
        }
    }

    /// Temporal interpolation kind for resampling.
    pub fn interpolation(&self) -> InterpolationKind {
        match self {
            Self::Surface(v) => match v {
                SurfaceVariable::Temperature2m | SurfaceVariable::PressureMsl => {
                    InterpolationKind::Hermite { bounds: None }
                }
                SurfaceVariable::RelativeHumidity2m | SurfaceVariable::CloudCover => {
                    InterpolationKind::Hermite {
                        bounds: Some((0.0, 100.0)),
                    }
                }
                SurfaceVariable::ShortwaveRadiation | SurfaceVariable::DiffuseRadiation => {
                    InterpolationKind::SolarBackwardsAveraged
                }
                SurfaceVariable::Precipitation
                | SurfaceVariable::WindSpeed10m
                | SurfaceVariable::WindDirection10m => InterpolationKind::Linear,
            },
            Self::Pressure { variable, .. } => match variable {
                PressureVariable::Temperature => InterpolationKind::Hermite { bounds: None },
                PressureVariable::RelativeHumidity | PressureVariable::CloudCover => {
                    InterpolationKind::Hermite {
                        bounds: Some((0.0, 100.0)),
                    }
                }
                PressureVariable::GeopotentialHeight => InterpolationKind::Linear,
            },
        }
    }

    /// True for temperature-like surface variables that follow the standard
    /// lapse rate between the grid-cell elevation and the queried elevation.
    pub fn is_elevation_correctable(&self) -> bool {
        matches!(self, Self::Surface(SurfaceVariable::Temperature2m))
    }

    /// Capability flags consulted by the reader.
    pub fn capabilities(&self) -> VariableCapabilities {
        match self {
            Self::Pressure { variable, .. } => VariableCapabilities {
                can_interpolate_pressure: true,
                derives_cloud_cover_from_rh: *variable == PressureVariable::CloudCover,
                derives_diffuse_from_shortwave: false,
            },
            Self::Surface(SurfaceVariable::DiffuseRadiation) => VariableCapabilities {
                can_interpolate_pressure: false,
                derives_cloud_cover_from_rh: false,
                derives_diffuse_from_shortwave: true,
            },
            Self::Surface(_) => VariableCapabilities::default(),
        }
    }

    /// Parse an API variable name, e.g. `temperature_2m` or
    /// `relative_humidity_850hPa`.
    pub fn parse(name: &str) -> Option<Self> {
        if let Some(v) = SurfaceVariable::parse(name) {
            return Some(Self::Surface(v));
        }
        let (stem, level) = name.rsplit_once('_')?;
        let level: i32 = level.strip_suffix("hPa")?.parse().ok()?;
        let variable = PressureVariable::parse(stem)?;
        Some(Self::Pressure { variable, level })
    }
}

impl std::fmt::Display for WeatherVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.file_stem())
    }
}

impl SurfaceVariable {
    fn stem(&self) -> &'static str {
        match self {
            Self::Temperature2m => "temperature_2m",
            Self::RelativeHumidity2m => "relative_humidity_2m",
            Self::Precipitation => "precipitation",
            Self::CloudCover => "cloud_cover",
            Self::PressureMsl => "pressure_msl",
            Self::WindSpeed10m => "wind_speed_10m",
            Self::WindDirection10m => "wind_direction_10m",
            Self::ShortwaveRadiation => "shortwave_radiation",
            Self::DiffuseRadiation => "diffuse_radiation",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "temperature_2m" => Some(Self::Temperature2m),
            "relative_humidity_2m" => Some(Self::RelativeHumidity2m),
            "precipitation" => Some(Self::Precipitation),
            "cloud_cover" => Some(Self::CloudCover),
            "pressure_msl" => Some(Self::PressureMsl),
            "wind_speed_10m" => Some(Self::WindSpeed10m),
            "wind_direction_10m" => Some(Self::WindDirection10m),
            "shortwave_radiation" => Some(Self::ShortwaveRadiation),
            "diffuse_radiation" => Some(Self::DiffuseRadiation),
            _ => None,
        }
    }
}

impl PressureVariable {
    fn stem(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::RelativeHumidity => "relative_humidity",
            Self::GeopotentialHeight => "geopotential_height",
            Self::CloudCover => "cloud_cover",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name {
            "temperature" => Some(Self::Temperature),
            "relative_humidity" => Some(Self::RelativeHumidity),
            "geopotential_height" => Some(Self::GeopotentialHeight),
            "cloud_cover" => Some(Self::CloudCover),
            _ => None,
        }
    }
}
