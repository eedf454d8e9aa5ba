//! Skill-tier distance tables and plausibility checks.
//!
//! Everything here is in yards: the tables are the numbers golfers quote.
//! Callers holding meters convert with [`crate::units::meters_to_whole_yards`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Club, EngineError};

/// Observed distances above this multiple of the tier's longest typical
/// distance are flagged.
pub const UNREALISTIC_FACTOR: f64 = 1.5;

/// Coarse player ability classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum SkillTier {
    Beginner,
    Intermediate,
    Advanced,
    Professional,
}

impl FromStr for SkillTier {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "professional" | "pro" => Ok(Self::Professional),
            _ => Err(EngineError::UnknownSkillTier { tier: s.to_string() }),
        }
    }
}

impl fmt::Display for SkillTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
            Self::Professional => write!(f, "professional"),
        }
    }
}

/// What kind of shot the golfer is planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum ShotCategory {
    Drive,
    #[default]
    Approach,
    Chip,
    Putt,
}

impl ShotCategory {
    /// Parse a category name; unknown names fall back to `Approach`.
    pub fn parse_lossy(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "drive" | "tee" => Self::Drive,
            "chip" | "pitch" => Self::Chip,
            "putt" => Self::Putt,
            _ => Self::Approach,
        }
    }

    /// Below this the shot is implausibly short for the category (yd).
    pub fn floor_yards(&self) -> u32 {
        match self {
            Self::Drive => 50,
            Self::Approach => 20,
            Self::Chip => 2,
            Self::Putt => 0,
        }
    }
}

impl fmt::Display for ShotCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drive => write!(f, "drive"),
            Self::Approach => write!(f, "approach"),
            Self::Chip => write!(f, "chip"),
            Self::Putt => write!(f, "putt"),
        }
    }
}

/// Realism verdict for a single observed distance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceCheck {
    pub is_realistic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Full skill-aware verdict attached to a placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillVerdict {
    pub suggested_distances: Vec<u32>,
    pub club_suggestions: Vec<String>,
    pub is_realistic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Typical distances (yd) for a tier and category, shortest first.
pub fn suggested_distances(tier: SkillTier, category: ShotCategory) -> Vec<u32> {
    distance_table(tier, category).to_vec()
}

fn distance_table(tier: SkillTier, category: ShotCategory) -> &'static [u32] {
    use ShotCategory::*;
    use SkillTier::*;
    match (tier, category) {
        (Beginner, Drive) => &[150, 170, 190, 210],
        (Beginner, Approach) => &[60, 80, 100, 120, 140],
        (Beginner, Chip) => &[5, 10, 20, 30],
        (Beginner, Putt) => &[2, 5, 10, 15],

        (Intermediate, Drive) => &[190, 210, 230, 250],
        (Intermediate, Approach) => &[80, 100, 120, 140, 160],
        (Intermediate, Chip) => &[5, 15, 25, 40],
        (Intermediate, Putt) => &[2, 5, 10, 20],

        (Advanced, Drive) => &[220, 240, 260, 280],
        (Advanced, Approach) => &[100, 125, 150, 175, 190],
        (Advanced, Chip) => &[5, 15, 30, 50],
        (Advanced, Putt) => &[2, 5, 10, 25],

        (Professional, Drive) => &[270, 290, 310, 330],
        (Professional, Approach) => &[120, 150, 180, 210, 230],
        (Professional, Chip) => &[5, 20, 35, 60],
        (Professional, Putt) => &[2, 5, 15, 30],
    }
}

/// Longest typical distance for the tier and category (yd).
pub fn typical_upper_yards(tier: SkillTier, category: ShotCategory) -> u32 {
    distance_table(tier, category)
        .iter()
        .copied()
        .max()
        .unwrap_or(0)
}

/// Clubs a player of this tier usually reaches for, in bag order.
pub fn club_suggestions(tier: SkillTier, category: ShotCategory) -> Vec<String> {
    club_table(tier, category)
        .iter()
        .map(|c| c.name().to_string())
        .collect()
}

fn club_table(tier: SkillTier, category: ShotCategory) -> &'static [Club] {
    use Club::*;
    use ShotCategory::*;
    use SkillTier::*;
    match (tier, category) {
        (Beginner, Drive) => &[Wood3, Hybrid4, Hybrid5],
        (Intermediate, Drive) => &[Driver, Wood3, Hybrid3],
        (Advanced | Professional, Drive) => &[Driver, Wood3],

        (Beginner, Approach) => &[Hybrid5, Iron7, Iron9, PitchingWedge],
        (Intermediate, Approach) => &[Iron6, Iron7, Iron8, Iron9, PitchingWedge],
        (Advanced, Approach) => &[Iron5, Iron7, Iron9, PitchingWedge, GapWedge],
        (Professional, Approach) => &[Iron4, Iron6, Iron8, PitchingWedge, GapWedge],

        (Beginner, Chip) => &[Iron9, PitchingWedge],
        (Intermediate, Chip) => &[PitchingWedge, SandWedge],
        (Advanced | Professional, Chip) => &[GapWedge, SandWedge, LobWedge],

        (_, Putt) => &[Putter],
    }
}

/// Flag distances far outside what the tier hits for this category.
pub fn validate_distance(
    observed_yards: u32,
    tier: SkillTier,
    category: ShotCategory,
) -> DistanceCheck {
    let upper = typical_upper_yards(tier, category);
    let ceiling = f64::from(upper) * UNREALISTIC_FACTOR;
    let floor = category.floor_yards();

    if f64::from(observed_yards) > ceiling {
        return DistanceCheck {
            is_realistic: false,
            note: Some(format!(
                "{observed_yards} yd is well beyond a typical {tier} {category} (up to {upper} yd); \
                 check the target or plan a layup"
            )),
        };
    }
    if observed_yards < floor {
        return DistanceCheck {
            is_realistic: false,
            note: Some(format!(
                "{observed_yards} yd is unusually short for a {category} (at least {floor} yd expected); \
                 consider a shorter shot type"
            )),
        };
    }
    DistanceCheck {
        is_realistic: true,
        note: None,
    }
}

/// Suggestions plus the realism check, as attached to a placement.
pub fn verdict(observed_yards: u32, tier: SkillTier, category: ShotCategory) -> SkillVerdict {
    let check = validate_distance(observed_yards, tier, category);
    SkillVerdict {
        suggested_distances: suggested_distances(tier, category),
        club_suggestions: club_suggestions(tier, category),
        is_realistic: check.is_realistic,
        note: check.note,
    }
}
