//! Distance values and the meter/yard boundary.
//!
//! The engine works in meters. Yards appear only where a golfer reads a
//! number (the web boundary) and in skill validation, whose tables are
//! in yards.

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// 1 meter = 1.09361 yards.
pub const METERS_TO_YARDS: f64 = 1.09361;

/// Convert meters to yards using [`METERS_TO_YARDS`].
pub fn meters_to_yards(meters: f64) -> f64 {
    meters * METERS_TO_YARDS
}

/// Convert meters to whole yards for table lookups. Negative input saturates at 0.
pub fn meters_to_whole_yards(meters: f64) -> u32 {
    meters_to_yards(meters).round().max(0.0) as u32
}

/// A distance value with unit. Serializes as a suffix string: `"10m"`,
/// `"1600m"`, `"150yd"`, `"30ft"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distance {
    Meters(f64),
    Yards(f64),
    Feet(f64),
}

impl Serialize for Distance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Distance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl std::str::FromStr for Distance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // "m" last so it never shadows a longer suffix
        for (suffix, ctor) in &[
            ("yd", Self::Yards as fn(f64) -> Self),
            ("ft", Self::Feet as fn(f64) -> Self),
            ("m", Self::Meters as fn(f64) -> Self),
        ] {
            if let Some(num) = s.strip_suffix(suffix) {
                let v: f64 = num
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid number in distance: {s:?}"))?;
                return Ok(ctor(v));
            }
        }
        Err(format!(
            "invalid distance {s:?}: expected number with suffix (m, yd, ft)"
        ))
    }
}

impl Distance {
    pub fn value(self) -> f64 {
        match self {
            Self::Meters(v) | Self::Yards(v) | Self::Feet(v) => v,
        }
    }

    pub fn unit_suffix(self) -> &'static str {
        match self {
            Self::Meters(_) => "m",
            Self::Yards(_) => "yd",
            Self::Feet(_) => "ft",
        }
    }

    pub fn as_meters(self) -> f64 {
        match self {
            Self::Meters(v) => v,
            Self::Yards(v) => v / METERS_TO_YARDS,
            Self::Feet(v) => v * 0.3048,
        }
    }

    pub fn as_yards(self) -> f64 {
        match self {
            Self::Meters(v) => meters_to_yards(v),
            Self::Yards(v) => v,
            Self::Feet(v) => v / 3.0,
        }
    }

    /// Re-express in the unit a golfer using `system` expects to read.
    pub fn in_system(self, system: UnitSystem) -> Distance {
        match system {
            UnitSystem::Imperial => Self::Yards(self.as_yards()),
            UnitSystem::Metric => Self::Meters(self.as_meters()),
        }
    }
}

impl Default for Distance {
    fn default() -> Self {
        Self::Meters(0.0)
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value(), self.unit_suffix())
    }
}

/// Unit system for display. Imperial = yards, Metric = meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Imperial,
    Metric,
}

impl UnitSystem {
    /// Parse `"imperial"` / `"metric"`. Anything else is `None`.
    pub fn from_code(s: &str) -> Option<Self> {
        match s {
            "imperial" => Some(Self::Imperial),
            "metric" => Some(Self::Metric),
            _ => None,
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Imperial => write!(f, "imperial"),
            Self::Metric => write!(f, "metric"),
        }
    }
}
