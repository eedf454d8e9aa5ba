//! Unified `FairwayMessage` bus types.
//!
//! All events flow through a single `broadcast<FairwayMessage>` channel.
//! Each message has a source (global ID of the originator), a timestamp, and
//! a typed event. Producers create messages; consumers subscribe and filter.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::placement::{
    ClubRequest, CompletedShot, PlacementState, ShotPlacement, SkillContext,
};
use crate::{
    Coordinate, CourseSection, EngineError, FairwayConfig, ProximityResult, ShotCategory,
    SkillTier,
};

// ---------------------------------------------------------------------------
// Top-level message
// ---------------------------------------------------------------------------

/// A single event on the unified bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FairwayMessage {
    #[serde(default)]
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub event: FairwayEvent,
}

impl FairwayMessage {
    /// Create a new message with the current UTC timestamp.
    pub fn new(event: impl Into<FairwayEvent>) -> Self {
        Self {
            source: String::new(),
            timestamp: Utc::now(),
            event: event.into(),
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

// ---------------------------------------------------------------------------
// From impls: inner event types -> FairwayEvent
// ---------------------------------------------------------------------------

impl From<LocationFix> for FairwayEvent {
    fn from(fix: LocationFix) -> Self {
        FairwayEvent::Location(fix)
    }
}

impl From<PlacementAction> for FairwayEvent {
    fn from(action: PlacementAction) -> Self {
        FairwayEvent::PlacementCommand(PlacementCommand {
            request_id: None,
            action,
        })
    }
}

impl From<PlacementCommand> for FairwayEvent {
    fn from(cmd: PlacementCommand) -> Self {
        FairwayEvent::PlacementCommand(cmd)
    }
}

impl From<PlacementOutcome> for FairwayEvent {
    fn from(outcome: PlacementOutcome) -> Self {
        FairwayEvent::PlacementOutcome(outcome)
    }
}

impl From<PlacementSnapshot> for FairwayEvent {
    fn from(snapshot: PlacementSnapshot) -> Self {
        FairwayEvent::PlacementSnapshot(snapshot)
    }
}

impl From<ClubRequest> for FairwayEvent {
    fn from(request: ClubRequest) -> Self {
        FairwayEvent::ClubRecommendationRequest(request)
    }
}

impl From<ClubRecommendation> for FairwayEvent {
    fn from(rec: ClubRecommendation) -> Self {
        FairwayEvent::ClubRecommendation(rec)
    }
}

impl From<ProximityResult> for FairwayEvent {
    fn from(result: ProximityResult) -> Self {
        FairwayEvent::Proximity(result)
    }
}

impl From<ActorState> for FairwayEvent {
    fn from(state: ActorState) -> Self {
        FairwayEvent::ActorStatus(state)
    }
}

impl From<ConfigCommand> for FairwayEvent {
    fn from(cmd: ConfigCommand) -> Self {
        FairwayEvent::ConfigCommand(cmd)
    }
}

impl From<ConfigOutcome> for FairwayEvent {
    fn from(result: ConfigOutcome) -> Self {
        FairwayEvent::ConfigOutcome(result)
    }
}

impl From<AlertMessage> for FairwayEvent {
    fn from(alert: AlertMessage) -> Self {
        FairwayEvent::Alert(alert)
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// The typed event payload carried by a `FairwayMessage`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FairwayEvent {
    /// A GPS fix from a location source.
    Location(LocationFix),
    /// User command for the placement engine.
    PlacementCommand(PlacementCommand),
    /// Reply to a `PlacementCommand` that carried a `request_id`.
    PlacementOutcome(PlacementOutcome),
    /// Emitted on every observable placement change.
    PlacementSnapshot(PlacementSnapshot),
    /// Placement owner asking the advisor for a club.
    ClubRecommendationRequest(ClubRequest),
    /// Advisor answer, tagged with the placement generation it was asked for.
    ClubRecommendation(ClubRecommendation),
    /// Course proximity changed.
    Proximity(ProximityResult),
    /// Generic actor status update.
    ActorStatus(ActorState),
    /// Config mutation request (emitted by POST handler).
    ConfigCommand(ConfigCommand),
    /// Config mutation outcome (emitted by SystemActor after processing).
    ConfigOutcome(ConfigOutcome),
    /// Alert for user-visible warn/error conditions.
    Alert(AlertMessage),
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationFix {
    pub position: Coordinate,
}

// ---------------------------------------------------------------------------
// PlacementCommand: user commands, request/reply
// ---------------------------------------------------------------------------

/// A command for the placement actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementCommand {
    /// Opaque correlation ID. When present the placement actor answers
    /// with a `PlacementOutcome` carrying the same ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub action: PlacementAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlacementAction {
    Create {
        target: Coordinate,
        #[serde(default)]
        pin: Option<Coordinate>,
        #[serde(default)]
        hole_number: Option<u32>,
        position: Coordinate,
    },
    Activate,
    Cancel,
    UpdateSkillContext {
        tier: SkillTier,
        category: ShotCategory,
    },
}

impl fmt::Display for PlacementAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create { .. } => write!(f, "create"),
            Self::Activate => write!(f, "activate"),
            Self::Cancel => write!(f, "cancel"),
            Self::UpdateSkillContext { .. } => write!(f, "update_skill_context"),
        }
    }
}

/// Definitive answer to a placement command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementOutcome {
    pub request_id: String,
    /// Placement after the command (absent when none is in flight).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<ShotPlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EngineError>,
}

/// Observable placement state. `Completed` appears exactly once per shot,
/// carrying the finished shot; the next snapshot is `Inactive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementSnapshot {
    pub state: PlacementState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<ShotPlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<CompletedShot>,
    /// Skill context the engine is judging distances against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<SkillContext>,
}

impl PlacementSnapshot {
    pub fn of(placement: Option<&ShotPlacement>) -> Self {
        Self {
            state: placement.map_or(PlacementState::Inactive, |p| p.state),
            placement: placement.cloned(),
            completed: None,
            skill: None,
        }
    }

    pub fn completed(shot: CompletedShot) -> Self {
        Self {
            state: PlacementState::Completed,
            placement: None,
            completed: Some(shot),
            skill: None,
        }
    }

    pub fn with_skill(mut self, skill: Option<SkillContext>) -> Self {
        self.skill = skill;
        self
    }
}

// ---------------------------------------------------------------------------
// Club recommendation
// ---------------------------------------------------------------------------

/// Advisor reply. Exactly one of `club` / `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubRecommendation {
    pub placement_id: Uuid,
    pub generation: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClubRecommendation {
    pub fn into_result(self) -> Result<String, EngineError> {
        match (self.club, self.error) {
            (Some(club), None) => Ok(club),
            (_, Some(reason)) => Err(EngineError::AdvisoryUnavailable { reason }),
            (None, None) => Err(EngineError::AdvisoryUnavailable {
                reason: "empty recommendation".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// ActorStatus: generic actor lifecycle
// ---------------------------------------------------------------------------

/// Generic actor lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorStatus {
    Starting,
    Disconnected,
    Connected,
}

impl fmt::Display for ActorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

/// Actor state emitted on the bus. Carries lifecycle status and
/// actor-specific key/value telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorState {
    pub status: ActorStatus,
    #[serde(default)]
    pub telemetry: HashMap<String, String>,
}

impl ActorState {
    pub fn new(status: ActorStatus, telemetry: HashMap<String, String>) -> Self {
        Self { status, telemetry }
    }
}

// ---------------------------------------------------------------------------
// ConfigCommand: config mutation request
// ---------------------------------------------------------------------------

/// A request to mutate the system configuration.
///
/// Processed exclusively by `SystemActor`, which applies the mutation,
/// reconciles actors, and optionally emits a `ConfigOutcome`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigCommand {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub action: ConfigAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConfigAction {
    /// Replace the entire config. Used by POST /api/settings.
    ReplaceAll { config: FairwayConfig },
    /// Add or change one saved course.
    UpsertCourse { index: String, section: CourseSection },
    /// Remove a section by global ID ("course.0", "advisor.1").
    Remove { id: String },
}

/// Acknowledgment of a config mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOutcome {
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restarted: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stopped: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub started: Vec<String>,
}

// ---------------------------------------------------------------------------
// AlertMessage: user-visible warn/error notifications
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Warn,
    Error,
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Warn => write!(f, "warn"),
            AlertLevel::Error => write!(f, "error"),
        }
    }
}

/// A user-visible alert. Info/debug/trace stays in the tracing backend;
/// warn/error conditions surface here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertMessage {
    pub level: AlertLevel,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_format() {
        let json = r#"{
            "source": "ws.1",
            "timestamp": "2026-10-19T10:00:00Z",
            "event": {
                "kind": "placement_command",
                "request_id": "r1",
                "action": {
                    "type": "create",
                    "target": { "latitude": 55.0215, "longitude": -7.247 },
                    "position": { "latitude": 55.0209, "longitude": -7.2479, "captured_at_millis": 5 }
                }
            }
        }"#;
        let msg: FairwayMessage = serde_json::from_str(json).unwrap();
        let FairwayEvent::PlacementCommand(cmd) = msg.event else {
            panic!("wrong event kind");
        };
        assert_eq!(cmd.request_id.as_deref(), Some("r1"));
        assert!(matches!(
            cmd.action,
            PlacementAction::Create { pin: None, hole_number: None, .. }
        ));
    }

    #[test]
    fn invalid_coordinate_is_rejected_on_the_wire() {
        let json = r#"{ "kind": "location", "position": { "latitude": 91.0, "longitude": 0.0 } }"#;
        assert!(serde_json::from_str::<FairwayEvent>(json).is_err());
    }

    #[test]
    fn recommendation_result() {
        let ok = ClubRecommendation {
            placement_id: Uuid::nil(),
            generation: 3,
            club: Some("9 Iron".into()),
            error: None,
        };
        assert_eq!(ok.into_result(), Ok("9 Iron".to_string()));

        let failed = ClubRecommendation {
            placement_id: Uuid::nil(),
            generation: 3,
            club: None,
            error: Some("timeout".into()),
        };
        assert!(matches!(
            failed.into_result(),
            Err(EngineError::AdvisoryUnavailable { .. })
        ));
    }
}
