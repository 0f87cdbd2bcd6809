//! Physical units carried alongside variable data.
//!
//! The storage layer is unit-agnostic; units travel with the decoded series so
//! the mixer can enforce agreement across domains and the API layer can apply
//! output conversions.

use serde::{Deserialize, Serialize};

/// Unit of measurement for a variable series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Celsius,
    Fahrenheit,
    Kelvin,
    Percent,
    Pascal,
    Hectopascal,
    MetresPerSecond,
    KilometresPerHour,
    MilesPerHour,
    Knots,
    Millimetre,
    Inch,
    WattPerSquareMetre,
    Metre,
    Degree,
    Dimensionless,
}

impl Unit {
    /// Symbol as rendered in API responses.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
            Self::Kelvin => "K",
            Self::Percent => "%",
            Self::Pascal => "Pa",
            Self::Hectopascal => "hPa",
            Self::MetresPerSecond => "m/s",
            Self::KilometresPerHour => "km/h",
            Self::MilesPerHour => "mp/h",
            Self::Knots => "kn",
            Self::Millimetre => "mm",
            Self::Inch => "inch",
            Self::WattPerSquareMetre => "W/m²",
            Self::Metre => "m",
            Self::Degree => "°",
            Self::Dimensionless => "",
        }
    }

    /// Whether this unit measures temperature.
    ///
    /// Elevation correction only applies to temperature-typed series.
    pub fn is_temperature(&self) -> bool {
        matches!(self, Self::Celsius | Self::Fahrenheit | Self::Kelvin)
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols() {
        assert_eq!(Unit::Celsius.symbol(), "°C");
        assert_eq!(Unit::Hectopascal.symbol(), "hPa");
        assert_eq!(Unit::WattPerSquareMetre.symbol(), "W/m²");
    }

    #[test]
    fn test_is_temperature() {
        assert!(Unit::Celsius.is_temperature());
        assert!(Unit::Kelvin.is_temperature());
        assert!(!Unit::Percent.is_temperature());
        assert!(!Unit::Metre.is_temperature());
    }
}
