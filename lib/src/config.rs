//! Persisted config schema (shared between the runtime and any client).
//!
//! Sections are indexed maps keyed by a short id, so the TOML reads
//! `[course.0]`, `[course.links]`, `[webserver.0]`, and so on. Distances are
//! unit-suffixed strings so the file stays hand-editable.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::placement::{
    DEFAULT_COALESCE_INTERVAL, DEFAULT_MAX_FIX_ACCURACY_M, DEFAULT_MOVEMENT_THRESHOLD_M,
    DEFAULT_SETTLE_DELAY, EngineSettings,
};
use crate::proximity::DEFAULT_PROXIMITY_THRESHOLD_M;
use crate::{Coordinate, CourseAnchor, Distance, EngineError, ShotCategory, SkillTier, UnitSystem};

/// Top-level persisted config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairwayConfig {
    /// Unit system for distances shown to the golfer (yards by default)
    #[serde(default)]
    pub default_units: UnitSystem,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<PlayerSection>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub course: HashMap<String, CourseSection>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub mock_location: HashMap<String, MockLocationSection>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub advisor: HashMap<String, AdvisorSection>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub webserver: HashMap<String, WebserverSection>,
}

/// Engine tunables. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub movement_threshold: Distance,
    pub settle_delay_ms: u64,
    pub coalesce_interval_ms: u64,
    /// Fixes reporting a larger accuracy radius are skipped.
    pub max_fix_accuracy: Distance,
    pub proximity_threshold: Distance,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            movement_threshold: Distance::Meters(DEFAULT_MOVEMENT_THRESHOLD_M),
            settle_delay_ms: DEFAULT_SETTLE_DELAY.as_millis() as u64,
            coalesce_interval_ms: DEFAULT_COALESCE_INTERVAL.as_millis() as u64,
            max_fix_accuracy: Distance::Meters(DEFAULT_MAX_FIX_ACCURACY_M),
            proximity_threshold: Distance::Meters(DEFAULT_PROXIMITY_THRESHOLD_M),
        }
    }
}

impl EngineSection {
    pub fn settings(&self) -> EngineSettings {
        EngineSettings {
            movement_threshold_m: self.movement_threshold.as_meters(),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            coalesce_interval: Duration::from_millis(self.coalesce_interval_ms),
            max_fix_accuracy_m: self.max_fix_accuracy.as_meters(),
        }
    }

    pub fn proximity_threshold_m(&self) -> f64 {
        self.proximity_threshold.as_meters()
    }
}

/// Default skill context applied at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSection {
    pub tier: SkillTier,
    #[serde(default)]
    pub category: ShotCategory,
}

/// One saved course: the course directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSection {
    #[serde(default)]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl CourseSection {
    pub fn anchor(&self, course_id: &str) -> Result<CourseAnchor, EngineError> {
        Ok(CourseAnchor {
            course_id: course_id.to_string(),
            display_name: self.name.clone(),
            coordinate: Coordinate::new(self.latitude, self.longitude)?,
        })
    }
}

/// A simulated location source walking a straight line with GPS noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockLocationSection {
    #[serde(default)]
    pub name: String,
    pub start_latitude: f64,
    pub start_longitude: f64,
    #[serde(default)]
    pub heading_deg: f64,
    pub walk_speed_mps: Option<f64>,
    pub interval_ms: Option<u64>,
    pub jitter: Option<Distance>,
}

/// A club-recommendation service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvisorSection {
    #[serde(default)]
    pub name: String,
    /// Simulated service latency.
    pub latency_ms: Option<u64>,
    /// Fail every Nth request (exercises the unavailable path). `None` never fails.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail_every: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebserverSection {
    #[serde(default)]
    pub name: String,
    pub bind: String,
}

impl FairwayConfig {
    /// Course directory as anchors, ordered by course id. Invalid sections
    /// are logged and skipped.
    pub fn course_anchors(&self) -> Vec<CourseAnchor> {
        let mut ids: Vec<&String> = self.course.keys().collect();
        ids.sort();
        ids.into_iter()
            .filter_map(|id| match self.course[id].anchor(id) {
                Ok(anchor) => Some(anchor),
                Err(e) => {
                    tracing::warn!("course '{id}': {e}, skipped");
                    None
                }
            })
            .collect()
    }
}

impl Default for FairwayConfig {
    /// Known good defaults: one course, a simulated walker starting on it,
    /// a local advisor, and a local web server.
    fn default() -> Self {
        let mut course = HashMap::new();
        course.insert(
            "0".into(),
            CourseSection {
                name: "Home Course".into(),
                latitude: 55.0209,
                longitude: -7.2479,
            },
        );
        let mut mock_location = HashMap::new();
        mock_location.insert(
            "0".into(),
            MockLocationSection {
                name: "Simulated GPS".into(),
                start_latitude: 55.0209,
                start_longitude: -7.2479,
                heading_deg: 40.0,
                walk_speed_mps: Some(1.2),
                interval_ms: Some(1000),
                jitter: Some(Distance::Meters(1.5)),
            },
        );
        let mut advisor = HashMap::new();
        advisor.insert(
            "0".into(),
            AdvisorSection {
                name: "Distance Table".into(),
                latency_ms: Some(400),
                fail_every: None,
            },
        );
        let mut webserver = HashMap::new();
        webserver.insert(
            "0".into(),
            WebserverSection {
                name: "Web Server".into(),
                bind: "127.0.0.1:3030".into(),
            },
        );
        Self {
            default_units: UnitSystem::default(),
            engine: EngineSection::default(),
            player: None,
            course,
            mock_location,
            advisor,
            webserver,
        }
    }
}
