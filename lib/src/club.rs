//! Club identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Golf club.
///
/// Variants serialize to short wire codes (`"DR"`, `"7I"`, etc.) via serde rename.
/// `Display` returns the same code. `from_code()` parses case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Club {
    #[serde(rename = "DR")]
    Driver,
    #[serde(rename = "3W")]
    Wood3,
    #[serde(rename = "5W")]
    Wood5,
    #[serde(rename = "7W")]
    Wood7,
    #[serde(rename = "3H")]
    Hybrid3,
    #[serde(rename = "4H")]
    Hybrid4,
    #[serde(rename = "5H")]
    Hybrid5,
    #[serde(rename = "3I")]
    Iron3,
    #[serde(rename = "4I")]
    Iron4,
    #[serde(rename = "5I")]
    Iron5,
    #[serde(rename = "6I")]
    Iron6,
    #[serde(rename = "7I")]
    Iron7,
    #[serde(rename = "8I")]
    Iron8,
    #[serde(rename = "9I")]
    Iron9,
    #[serde(rename = "PW")]
    PitchingWedge,
    #[serde(rename = "GW")]
    GapWedge,
    #[serde(rename = "SW")]
    SandWedge,
    #[serde(rename = "LW")]
    LobWedge,
    #[serde(rename = "PT")]
    Putter,
}

impl Club {
    /// All variants in bag order (driver through putter). Typical carry
    /// decreases monotonically along this order.
    pub const ALL: &[Club] = &[
        Club::Driver,
        Club::Wood3,
        Club::Wood5,
        Club::Wood7,
        Club::Hybrid3,
        Club::Hybrid4,
        Club::Hybrid5,
        Club::Iron3,
        Club::Iron4,
        Club::Iron5,
        Club::Iron6,
        Club::Iron7,
        Club::Iron8,
        Club::Iron9,
        Club::PitchingWedge,
        Club::GapWedge,
        Club::SandWedge,
        Club::LobWedge,
        Club::Putter,
    ];

    /// Parse a club code case-insensitively. Returns `None` for unknown codes.
    pub fn from_code(s: &str) -> Option<Club> {
        let upper = s.to_uppercase();
        Club::ALL.iter().copied().find(|c| c.code() == upper)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Club::Driver => "DR",
            Club::Wood3 => "3W",
            Club::Wood5 => "5W",
            Club::Wood7 => "7W",
            Club::Hybrid3 => "3H",
            Club::Hybrid4 => "4H",
            Club::Hybrid5 => "5H",
            Club::Iron3 => "3I",
            Club::Iron4 => "4I",
            Club::Iron5 => "5I",
            Club::Iron6 => "6I",
            Club::Iron7 => "7I",
            Club::Iron8 => "8I",
            Club::Iron9 => "9I",
            Club::PitchingWedge => "PW",
            Club::GapWedge => "GW",
            Club::SandWedge => "SW",
            Club::LobWedge => "LW",
            Club::Putter => "PT",
        }
    }

    /// Human-readable name, e.g. `"7 Iron"`.
    pub fn name(&self) -> &'static str {
        match self {
            Club::Driver => "Driver",
            Club::Wood3 => "3 Wood",
            Club::Wood5 => "5 Wood",
            Club::Wood7 => "7 Wood",
            Club::Hybrid3 => "3 Hybrid",
            Club::Hybrid4 => "4 Hybrid",
            Club::Hybrid5 => "5 Hybrid",
            Club::Iron3 => "3 Iron",
            Club::Iron4 => "4 Iron",
            Club::Iron5 => "5 Iron",
            Club::Iron6 => "6 Iron",
            Club::Iron7 => "7 Iron",
            Club::Iron8 => "8 Iron",
            Club::Iron9 => "9 Iron",
            Club::PitchingWedge => "Pitching Wedge",
            Club::GapWedge => "Gap Wedge",
            Club::SandWedge => "Sand Wedge",
            Club::LobWedge => "Lob Wedge",
            Club::Putter => "Putter",
        }
    }

    /// Typical carry for a mid-handicap player (yd).
    pub fn typical_carry_yards(&self) -> u32 {
        match self {
            Club::Driver => 230,
            Club::Wood3 => 215,
            Club::Wood5 => 200,
            Club::Wood7 => 190,
            Club::Hybrid3 => 185,
            Club::Hybrid4 => 180,
            Club::Hybrid5 => 175,
            Club::Iron3 => 170,
            Club::Iron4 => 165,
            Club::Iron5 => 160,
            Club::Iron6 => 150,
            Club::Iron7 => 140,
            Club::Iron8 => 130,
            Club::Iron9 => 120,
            Club::PitchingWedge => 110,
            Club::GapWedge => 95,
            Club::SandWedge => 80,
            Club::LobWedge => 60,
            Club::Putter => 0,
        }
    }

    /// Shortest-carrying club that still reaches `yards`. Under 10 yd is a putt;
    /// beyond driver range it is still the driver.
    pub fn for_carry_yards(yards: f64) -> Club {
        if yards < 10.0 {
            return Club::Putter;
        }
        Club::ALL
            .iter()
            .rev()
            .copied()
            .filter(|c| *c != Club::Putter)
            .find(|c| f64::from(c.typical_carry_yards()) >= yards)
            .unwrap_or(Club::Driver)
    }
}

impl fmt::Display for Club {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
