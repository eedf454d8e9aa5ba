//! Round state: what the running system last heard about the golfer.
//!
//! Read side is shared with every actor and the web layer; the only writer
//! is held by the system actor, which fills it from bus events.

use std::sync::{Arc, RwLock};

use serde::Serialize;

use fairway::{
    CompletedShot, Coordinate, EngineSettings, ProximityResult, ShotPlacement, SkillContext,
};

/// Point-in-time copy of the round state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoundSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_position: Option<Coordinate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<ShotPlacement>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proximity: Option<ProximityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill: Option<SkillContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<CompletedShot>,
}

/// Read-only handle.
pub struct RoundState {
    inner: Arc<RwLock<RoundSnapshot>>,
}

/// Write handle. Only the system actor holds one.
pub struct RoundStateWriter {
    inner: Arc<RwLock<RoundSnapshot>>,
}

impl RoundState {
    pub fn new() -> (Self, RoundStateWriter) {
        let inner = Arc::new(RwLock::new(RoundSnapshot::default()));
        (
            Self {
                inner: Arc::clone(&inner),
            },
            RoundStateWriter { inner },
        )
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        self.inner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_position(&self) -> Option<Coordinate> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .last_position
    }
}

impl RoundStateWriter {
    fn with(&self, f: impl FnOnce(&mut RoundSnapshot)) {
        f(&mut self.inner.write().unwrap_or_else(|e| e.into_inner()));
    }

    /// Keep `position` as the last fix unless it was captured before the
    /// one already held or is less precise than `settings` allow.
    pub fn offer_position(&self, position: Coordinate, settings: &EngineSettings) -> bool {
        if !settings.accepts(&position) {
            return false;
        }
        let mut kept = false;
        self.with(|s| {
            if s.last_position
                .is_none_or(|last| position.captured_at_millis() >= last.captured_at_millis())
            {
                s.last_position = Some(position);
                kept = true;
            }
        });
        kept
    }

    /// `None` clears the in-flight placement (cancelled or completed).
    pub fn set_placement(&self, placement: Option<ShotPlacement>) {
        self.with(|s| s.placement = placement);
    }

    pub fn set_completed(&self, shot: CompletedShot) {
        self.with(|s| {
            s.placement = None;
            s.last_completed = Some(shot);
        });
    }

    pub fn set_proximity(&self, result: ProximityResult) {
        self.with(|s| s.proximity = Some(result));
    }

    pub fn set_skill(&self, skill: SkillContext) {
        self.with(|s| s.skill = Some(skill));
    }
}
