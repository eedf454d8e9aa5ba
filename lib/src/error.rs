//! Engine error taxonomy.
//!
//! Every variant is local and recoverable. A rejected operation leaves the
//! engine exactly as it was.

use serde::{Deserialize, Serialize};

/// Errors surfaced by the engine and its value types.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineError {
    /// Latitude/longitude outside their ranges, non-finite, or a negative
    /// accuracy radius.
    #[error("invalid coordinate ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// A placement is already `Placed` or `Activated`.
    #[error("a shot placement is already in flight")]
    AlreadyInFlight,

    /// The operation needs a placement in a state it is not in.
    #[error("no placement in the required state")]
    NoActivePlacement,

    /// The club-recommendation or skill-context collaborator failed.
    #[error("advisory unavailable: {reason}")]
    AdvisoryUnavailable { reason: String },

    /// Skill tier string did not name a known tier.
    #[error("unknown skill tier {tier:?}")]
    UnknownSkillTier { tier: String },
}
