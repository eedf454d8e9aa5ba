//! REST API request/response types shared between the app and any client.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    ActorStatus, CompletedShot, Coordinate, Distance, EngineError, PlacementState,
    ProximityResult, ShotCategory, ShotPlacement, SkillTier, SkillVerdict, UnitSystem,
};

/// GET /api/status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub actors: HashMap<String, ActorStatusResponse>,
    pub placement_state: PlacementState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_position: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_course: Option<String>,
}

/// Per-actor status within the status response. Also used as the cached
/// per-actor state in the web layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorStatusResponse {
    #[serde(default)]
    pub name: String,
    pub status: ActorStatus,
    #[serde(default)]
    pub telemetry: HashMap<String, String>,
}

/// POST /api/placement request body. `position` falls back to the last
/// known fix when omitted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreatePlacementRequest {
    pub target: Coordinate,
    #[serde(default)]
    pub pin: Option<Coordinate>,
    #[serde(default)]
    pub hole_number: Option<u32>,
    #[serde(default)]
    pub position: Option<Coordinate>,
}

/// POST /api/skill request body. Both fields are free text on the wire:
/// an unknown tier is rejected, an unknown category reads as approach.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SkillRequest {
    pub tier: String,
    #[serde(default)]
    pub category: Option<String>,
}

impl SkillRequest {
    pub fn parse(&self) -> Result<(SkillTier, ShotCategory), EngineError> {
        let tier = self.tier.parse()?;
        let category = self
            .category
            .as_deref()
            .map(ShotCategory::parse_lossy)
            .unwrap_or_default();
        Ok((tier, category))
    }
}

/// Query string for GET /api/placement.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnitsQuery {
    #[serde(default)]
    pub units: Option<String>,
}

/// A placement as the golfer reads it: distances in the requested unit
/// system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementView {
    pub id: Uuid,
    pub generation: u64,
    pub state: PlacementState,
    pub hole_number: u32,
    pub target: Coordinate,
    pub origin: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<Coordinate>,
    pub position: Coordinate,
    pub distance_to_target: Distance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_pin: Option<Distance>,
    pub bearing_to_target_deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club_recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_verdict: Option<SkillVerdict>,
}

impl PlacementView {
    pub fn new(p: &ShotPlacement, units: UnitSystem) -> Self {
        let show = |meters: f64| Distance::Meters(meters).in_system(units);
        Self {
            id: p.id,
            generation: p.generation,
            state: p.state,
            hole_number: p.hole_number,
            target: p.target,
            origin: p.origin,
            pin: p.pin,
            position: p.position,
            distance_to_target: show(p.distance_to_target_m),
            distance_to_pin: p.distance_to_pin_m.map(show),
            bearing_to_target_deg: p.bearing_to_target_deg,
            club_recommendation: p.club_recommendation.clone(),
            skill_verdict: p.skill_verdict.clone(),
        }
    }
}

/// GET /api/placement response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacementResponse {
    pub state: PlacementState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<PlacementView>,
    /// Most recent finished shot, in the same units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<CompletedView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedView {
    pub placement_id: Uuid,
    pub hole_number: u32,
    pub landing: Coordinate,
    pub shot_distance: Distance,
    pub target_miss: Distance,
}

impl CompletedView {
    pub fn new(shot: &CompletedShot, units: UnitSystem) -> Self {
        Self {
            placement_id: shot.placement.id,
            hole_number: shot.placement.hole_number,
            landing: shot.landing,
            shot_distance: Distance::Meters(shot.shot_distance_m).in_system(units),
            target_miss: Distance::Meters(shot.target_miss_m).in_system(units),
        }
    }
}

/// GET /api/proximity response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProximityResponse {
    #[serde(flatten)]
    pub result: ProximityResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nearest_name: Option<String>,
}

/// Error body for every non-2xx API answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<EngineError>,
}

impl From<EngineError> for ErrorResponse {
    fn from(e: EngineError) -> Self {
        Self {
            error: e.to_string(),
            detail: Some(e),
        }
    }
}

/// Response to a config mutation (settings and course endpoints).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSettingsResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restarted: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stopped: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub started: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::EngineSettings;
    use crate::{ManualClock, ShotPlacementEngine};

    #[test]
    fn view_converts_to_yards() {
        let mut engine = ShotPlacementEngine::new(EngineSettings::default(), ManualClock::new(0));
        let origin = Coordinate::new(55.0209, -7.2479).unwrap();
        let target = Coordinate::new(55.0215, -7.2470).unwrap();
        engine
            .create_shot_placement(target, None, None, origin)
            .unwrap();
        let p = engine.current_placement().unwrap();

        let imperial = PlacementView::new(p, UnitSystem::Imperial);
        let Distance::Yards(yd) = imperial.distance_to_target else {
            panic!("expected yards");
        };
        assert!((yd - p.distance_to_target_m * 1.09361).abs() < 1e-9);

        let metric = PlacementView::new(p, UnitSystem::Metric);
        assert_eq!(
            metric.distance_to_target,
            Distance::Meters(p.distance_to_target_m)
        );
    }

    #[test]
    fn skill_request_parsing() {
        let req = SkillRequest {
            tier: "advanced".into(),
            category: Some("wedge".into()),
        };
        assert_eq!(
            req.parse().unwrap(),
            (SkillTier::Advanced, ShotCategory::Approach)
        );

        let bad = SkillRequest {
            tier: "legend".into(),
            category: None,
        };
        assert!(matches!(
            bad.parse(),
            Err(EngineError::UnknownSkillTier { .. })
        ));
    }
}
