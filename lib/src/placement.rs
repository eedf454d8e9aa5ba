//! Shot placement state machine.
//!
//! One placement at most is in flight. It advances
//! `Inactive -> Placed -> Activated -> Completed -> Inactive`, or drops back to
//! `Inactive` on cancel. `Completed` is never parked: the location update
//! that detects it hands the finished placement back once and the engine is
//! `Inactive` again.
//!
//! The engine is synchronous and owns no threads. Its owner serializes
//! calls and dispatches the [`ClubRequest`] returned from
//! [`ShotPlacementEngine::create_shot_placement`]; the answer comes back via
//! [`ShotPlacementEngine::apply_club_recommendation`] and is dropped unless
//! its generation still matches.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::geo::{Coordinate, bearing_degrees, distance_meters};
use crate::skill::{self, ShotCategory, SkillTier, SkillVerdict};
use crate::units::meters_to_whole_yards;
use crate::EngineError;

pub const DEFAULT_MOVEMENT_THRESHOLD_M: f64 = 10.0;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_COALESCE_INTERVAL: Duration = Duration::from_millis(300);
pub const DEFAULT_MAX_FIX_ACCURACY_M: f64 = 50.0;

/// Tunables for completion detection and update coalescing.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Distance from origin that counts as "the player walked to the ball" (m).
    pub movement_threshold_m: f64,
    /// Grace period after activation during which movement is ignored.
    pub settle_delay: Duration,
    /// Location updates closer together than this are coalesced.
    pub coalesce_interval: Duration,
    /// Fixes reporting a worse accuracy radius are skipped. Fixes without
    /// an accuracy are always taken.
    pub max_fix_accuracy_m: f64,
}

impl EngineSettings {
    /// Whether a fix is precise enough to act on.
    pub fn accepts(&self, position: &Coordinate) -> bool {
        position
            .accuracy_meters()
            .is_none_or(|accuracy| accuracy <= self.max_fix_accuracy_m)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            movement_threshold_m: DEFAULT_MOVEMENT_THRESHOLD_M,
            settle_delay: DEFAULT_SETTLE_DELAY,
            coalesce_interval: DEFAULT_COALESCE_INTERVAL,
            max_fix_accuracy_m: DEFAULT_MAX_FIX_ACCURACY_M,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementState {
    Inactive,
    Placed,
    Activated,
    Completed,
}

impl std::fmt::Display for PlacementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => write!(f, "inactive"),
            Self::Placed => write!(f, "placed"),
            Self::Activated => write!(f, "activated"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// The caller's skill tier and the kind of shot being planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillContext {
    pub tier: SkillTier,
    pub category: ShotCategory,
}

/// The one mutable record the engine owns.
///
/// Distances are meters. They are derived from `position` (the last applied
/// fix), never from `origin`, and are recomputed on every applied update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotPlacement {
    pub id: Uuid,
    pub generation: u64,
    pub state: PlacementState,
    pub hole_number: u32,
    pub target: Coordinate,
    /// Player position when the shot was placed. Never changes.
    pub origin: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<Coordinate>,
    pub position: Coordinate,
    pub distance_to_target_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_pin_m: Option<f64>,
    pub bearing_to_target_deg: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub club_recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_verdict: Option<SkillVerdict>,
    pub created_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activated_at_ms: Option<u64>,
}

impl ShotPlacement {
    fn recompute(&mut self, position: Coordinate, skill: Option<SkillContext>) {
        self.position = position;
        self.distance_to_target_m = distance_meters(&position, &self.target);
        self.distance_to_pin_m = self.pin.map(|pin| distance_meters(&position, &pin));
        self.bearing_to_target_deg = bearing_degrees(&position, &self.target);
        if let Some(ctx) = skill {
            self.refresh_verdict(ctx);
        }
    }

    fn refresh_verdict(&mut self, ctx: SkillContext) {
        let yards = meters_to_whole_yards(self.distance_to_target_m);
        self.skill_verdict = Some(skill::verdict(yards, ctx.tier, ctx.category));
    }

    /// True while the placement holds the single in-flight slot.
    pub fn is_in_flight(&self) -> bool {
        matches!(self.state, PlacementState::Placed | PlacementState::Activated)
    }
}

/// Club recommendation the owner must request for a fresh placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubRequest {
    pub placement_id: Uuid,
    pub generation: u64,
    pub distance_m: f64,
    pub hole_number: u32,
}

/// The single observation of a completed shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedShot {
    /// Final placement state, `state == Completed`.
    pub placement: ShotPlacement,
    /// Fix that triggered completion; the landing estimate.
    pub landing: Coordinate,
    /// Origin to landing (m).
    pub shot_distance_m: f64,
    /// Landing to target (m).
    pub target_miss_m: f64,
}

/// What a location update did.
#[derive(Debug)]
pub enum LocationOutcome<'a> {
    /// No placement in flight.
    Idle,
    /// Older than the last fix seen; ignored.
    Stale,
    /// Accuracy radius above the configured limit; ignored.
    Inaccurate,
    /// Inside the coalesce interval; kept as the pending fix.
    Coalesced,
    /// Distances recomputed.
    Updated(&'a ShotPlacement),
    /// Movement detected after the settle delay. The engine is `Inactive` now.
    Completed(CompletedShot),
}

/// Result of applying an asynchronous club recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvisoryOutcome {
    Applied,
    /// Placement cancelled, completed, or superseded; result discarded.
    Stale,
    /// The advisor failed; the field is left as it was.
    Unavailable,
}

/// Single-owner shot placement state machine.
pub struct ShotPlacementEngine<C: Clock = SystemClock> {
    settings: EngineSettings,
    clock: C,
    current: Option<ShotPlacement>,
    generation: u64,
    skill: Option<SkillContext>,
    /// `captured_at_millis` of the newest fix seen.
    last_fix_at: Option<i64>,
    /// Engine time of the last applied fix.
    last_applied_ms: Option<u64>,
    pending: Option<Coordinate>,
}

impl ShotPlacementEngine<SystemClock> {
    pub fn with_system_clock(settings: EngineSettings) -> Self {
        Self::new(settings, SystemClock::new())
    }
}

impl<C: Clock> ShotPlacementEngine<C> {
    pub fn new(settings: EngineSettings, clock: C) -> Self {
        Self {
            settings,
            clock,
            current: None,
            generation: 0,
            skill: None,
            last_fix_at: None,
            last_applied_ms: None,
            pending: None,
        }
    }

    /// Swap tunables in place. The in-flight placement is kept.
    pub fn set_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
    }

    pub fn current_placement(&self) -> Option<&ShotPlacement> {
        self.current.as_ref()
    }

    pub fn state(&self) -> PlacementState {
        self.current
            .as_ref()
            .map_or(PlacementState::Inactive, |p| p.state)
    }

    pub fn skill_context(&self) -> Option<SkillContext> {
        self.skill
    }

    /// Place a new shot. Fails with `AlreadyInFlight` while another is
    /// `Placed` or `Activated`.
    pub fn create_shot_placement(
        &mut self,
        target: Coordinate,
        pin: Option<Coordinate>,
        hole_number: Option<u32>,
        current_position: Coordinate,
    ) -> Result<ClubRequest, EngineError> {
        if self.current.as_ref().is_some_and(ShotPlacement::is_in_flight) {
            return Err(EngineError::AlreadyInFlight);
        }

        let now = self.clock.now_ms();
        self.generation += 1;

        let mut placement = ShotPlacement {
            id: Uuid::new_v4(),
            generation: self.generation,
            state: PlacementState::Placed,
            hole_number: hole_number.unwrap_or(1).max(1),
            target,
            origin: current_position,
            pin,
            position: current_position,
            distance_to_target_m: 0.0,
            distance_to_pin_m: None,
            bearing_to_target_deg: 0.0,
            club_recommendation: None,
            skill_verdict: None,
            created_at_ms: now,
            activated_at_ms: None,
        };
        placement.recompute(current_position, self.skill);

        self.note_fix(&current_position);
        self.last_applied_ms = Some(now);
        self.pending = None;

        let request = ClubRequest {
            placement_id: placement.id,
            generation: placement.generation,
            distance_m: placement.distance_to_target_m,
            hole_number: placement.hole_number,
        };
        tracing::debug!(
            "placement {} (gen {}): placed, {:.1}m to target",
            placement.id,
            placement.generation,
            placement.distance_to_target_m
        );
        self.current = Some(placement);
        Ok(request)
    }

    /// Commit to the placed target. Only legal from `Placed`.
    pub fn activate(&mut self) -> Result<&ShotPlacement, EngineError> {
        let now = self.clock.now_ms();
        match self.current.as_mut() {
            Some(p) if p.state == PlacementState::Placed => {
                p.state = PlacementState::Activated;
                p.activated_at_ms = Some(now);
                tracing::debug!("placement {} (gen {}): activated", p.id, p.generation);
                Ok(p)
            }
            _ => Err(EngineError::NoActivePlacement),
        }
    }

    /// Discard the in-flight placement. No-op when `Inactive`.
    pub fn cancel(&mut self) -> Option<ShotPlacement> {
        self.pending = None;
        let cancelled = self.current.take();
        if let Some(p) = &cancelled {
            tracing::debug!("placement {} (gen {}): cancelled", p.id, p.generation);
        }
        cancelled
    }

    /// Feed a fix from the location source.
    pub fn on_location_update(&mut self, position: Coordinate) -> LocationOutcome<'_> {
        if self.current.is_none() {
            self.note_fix(&position);
            self.pending = None;
            return LocationOutcome::Idle;
        }
        if self
            .last_fix_at
            .is_some_and(|last| position.captured_at_millis() < last)
        {
            return LocationOutcome::Stale;
        }
        if !self.settings.accepts(&position) {
            return LocationOutcome::Inaccurate;
        }

        self.note_fix(&position);
        let now = self.clock.now_ms();
        if !self.interval_elapsed(now) {
            self.pending = Some(position);
            return LocationOutcome::Coalesced;
        }
        self.apply(position, now)
    }

    /// Apply the pending coalesced fix once its interval has passed.
    /// `None` when there is nothing to apply yet.
    pub fn flush_pending(&mut self) -> Option<LocationOutcome<'_>> {
        self.pending?;
        let now = self.clock.now_ms();
        if !self.interval_elapsed(now) {
            return None;
        }
        let position = self.pending.take()?;
        Some(self.apply(position, now))
    }

    /// Store the skill context and recompute the verdict for the current
    /// placement. Never changes `state`.
    pub fn update_skill_context(
        &mut self,
        tier: SkillTier,
        category: ShotCategory,
    ) -> Option<&SkillVerdict> {
        let ctx = SkillContext { tier, category };
        self.skill = Some(ctx);
        let placement = self.current.as_mut()?;
        placement.refresh_verdict(ctx);
        placement.skill_verdict.as_ref()
    }

    /// Apply an advisor answer if it still belongs to the current placement.
    pub fn apply_club_recommendation(
        &mut self,
        generation: u64,
        result: Result<String, EngineError>,
    ) -> AdvisoryOutcome {
        let Some(p) = self
            .current
            .as_mut()
            .filter(|p| p.generation == generation)
        else {
            tracing::debug!("club recommendation for gen {generation} is stale, dropped");
            return AdvisoryOutcome::Stale;
        };
        match result {
            Ok(club) => {
                p.club_recommendation = Some(club);
                AdvisoryOutcome::Applied
            }
            Err(e) => {
                tracing::warn!("placement {} (gen {generation}): {e}", p.id);
                AdvisoryOutcome::Unavailable
            }
        }
    }

    fn note_fix(&mut self, position: &Coordinate) {
        let at = position.captured_at_millis();
        self.last_fix_at = Some(self.last_fix_at.map_or(at, |last| last.max(at)));
    }

    fn interval_elapsed(&self, now: u64) -> bool {
        let interval = self.settings.coalesce_interval.as_millis() as u64;
        self.last_applied_ms
            .is_none_or(|applied| now.saturating_sub(applied) >= interval)
    }

    fn apply(&mut self, position: Coordinate, now: u64) -> LocationOutcome<'_> {
        self.pending = None;
        self.last_applied_ms = Some(now);

        let skill = self.skill;
        let threshold = self.settings.movement_threshold_m;
        let settle = self.settings.settle_delay.as_millis() as u64;
        let moved = {
            let Some(placement) = self.current.as_mut() else {
                return LocationOutcome::Idle;
            };
            placement.recompute(position, skill);
            let settled = placement
                .activated_at_ms
                .is_some_and(|at| now.saturating_sub(at) >= settle);
            let moved = distance_meters(&position, &placement.origin);
            (placement.state == PlacementState::Activated && settled && moved >= threshold)
                .then_some(moved)
        };

        let Some(moved) = moved else {
            return match self.current.as_ref() {
                Some(p) => LocationOutcome::Updated(p),
                None => LocationOutcome::Idle,
            };
        };
        let Some(mut placement) = self.current.take() else {
            return LocationOutcome::Idle;
        };
        placement.state = PlacementState::Completed;
        let target_miss_m = distance_meters(&position, &placement.target);
        tracing::debug!(
            "placement {} (gen {}): completed, moved {moved:.1}m",
            placement.id,
            placement.generation
        );
        LocationOutcome::Completed(CompletedShot {
            placement,
            landing: position,
            shot_distance_m: moved,
            target_miss_m,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::geo::destination;

    fn origin() -> Coordinate {
        Coordinate::new(55.0209, -7.2479).unwrap()
    }

    fn target() -> Coordinate {
        Coordinate::new(55.0215, -7.2470).unwrap()
    }

    fn engine() -> (ShotPlacementEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new(1_000);
        (
            ShotPlacementEngine::new(EngineSettings::default(), clock.clone()),
            clock,
        )
    }

    /// A fix `meters` from the origin, stamped `at` ms.
    fn fix(meters: f64, at: i64) -> Coordinate {
        destination(&origin(), 200.0, meters).captured_at(at)
    }

    fn placed(e: &mut ShotPlacementEngine<ManualClock>) -> ClubRequest {
        e.create_shot_placement(target(), None, Some(4), origin())
            .unwrap()
    }

    #[test]
    fn create_computes_distances_and_request() {
        let (mut e, _) = engine();
        let pin = Coordinate::new(55.0216, -7.2469).unwrap();
        let req = e
            .create_shot_placement(target(), Some(pin), None, origin())
            .unwrap();

        let p = e.current_placement().unwrap();
        assert_eq!(p.state, PlacementState::Placed);
        assert_eq!(p.hole_number, 1);
        assert!(p.distance_to_target_m > 70.0 && p.distance_to_target_m < 90.0);
        assert!(p.distance_to_pin_m.unwrap() > p.distance_to_target_m);
        assert!(p.bearing_to_target_deg > 0.0 && p.bearing_to_target_deg < 90.0);
        assert_eq!(req.generation, p.generation);
        assert_eq!(req.placement_id, p.id);
        assert_eq!(req.distance_m, p.distance_to_target_m);
        assert!(p.skill_verdict.is_none());
    }

    #[test]
    fn single_flight() {
        let (mut e, _) = engine();
        placed(&mut e);
        let err = e
            .create_shot_placement(target(), None, None, origin())
            .unwrap_err();
        assert_eq!(err, EngineError::AlreadyInFlight);

        e.activate().unwrap();
        assert_eq!(
            e.create_shot_placement(target(), None, None, origin()),
            Err(EngineError::AlreadyInFlight)
        );
        assert_eq!(e.state(), PlacementState::Activated);

        e.cancel();
        assert!(e.create_shot_placement(target(), None, None, origin()).is_ok());
    }

    #[test]
    fn inactive_accepts_only_create() {
        let (mut e, _) = engine();
        assert_eq!(e.activate().unwrap_err(), EngineError::NoActivePlacement);
        assert!(e.cancel().is_none());
        assert!(matches!(e.on_location_update(fix(20.0, 5)), LocationOutcome::Idle));
        assert_eq!(e.state(), PlacementState::Inactive);
        assert!(e.current_placement().is_none());
    }

    #[test]
    fn second_activate_is_rejected_and_changes_nothing() {
        let (mut e, _) = engine();
        placed(&mut e);
        e.activate().unwrap();
        let before = e.current_placement().cloned();
        assert_eq!(e.activate().unwrap_err(), EngineError::NoActivePlacement);
        assert_eq!(e.current_placement().cloned(), before);
    }

    #[test]
    fn completes_once_after_settle_delay() {
        let (mut e, clock) = engine();
        placed(&mut e);
        e.activate().unwrap();
        clock.advance(DEFAULT_SETTLE_DELAY + Duration::from_millis(1));

        let done = match e.on_location_update(fix(15.0, 10)) {
            LocationOutcome::Completed(done) => done,
            other => panic!("expected completion, got {other:?}"),
        };
        assert_eq!(done.placement.state, PlacementState::Completed);
        assert!((done.shot_distance_m - 15.0).abs() < 0.01);
        assert!(e.current_placement().is_none());

        clock.advance(Duration::from_secs(1));
        assert!(matches!(e.on_location_update(fix(30.0, 20)), LocationOutcome::Idle));
    }

    #[test]
    fn jitter_during_settle_delay_does_not_complete() {
        let (mut e, clock) = engine();
        placed(&mut e);
        e.activate().unwrap();
        clock.advance(Duration::from_millis(500));

        let outcome = e.on_location_update(fix(15.0, 10));
        assert!(matches!(outcome, LocationOutcome::Updated(_)));
        assert_eq!(e.state(), PlacementState::Activated);
    }

    #[test]
    fn movement_below_threshold_does_not_complete() {
        let (mut e, clock) = engine();
        placed(&mut e);
        e.activate().unwrap();
        clock.advance(Duration::from_secs(10));
        assert!(matches!(
            e.on_location_update(fix(6.0, 10)),
            LocationOutcome::Updated(_)
        ));
    }

    #[test]
    fn placed_never_completes() {
        let (mut e, clock) = engine();
        placed(&mut e);
        clock.advance(Duration::from_secs(10));
        assert!(matches!(
            e.on_location_update(fix(50.0, 10)),
            LocationOutcome::Updated(_)
        ));
        assert_eq!(e.state(), PlacementState::Placed);
    }

    #[test]
    fn origin_is_fixed_while_distances_follow_position() {
        let (mut e, clock) = engine();
        placed(&mut e);
        let first = e.current_placement().unwrap().distance_to_target_m;

        for i in 1..=5 {
            clock.advance(Duration::from_secs(1));
            let towards = destination(&origin(), 50.0, 5.0 * i as f64).captured_at(i);
            e.on_location_update(towards);
            assert_eq!(e.current_placement().unwrap().origin, origin());
        }
        let last = e.current_placement().unwrap().distance_to_target_m;
        assert!(last < first, "{last} should be closer than {first}");
        assert!(last >= 0.0);
    }

    #[test]
    fn out_of_order_fixes_are_ignored() {
        let (mut e, clock) = engine();
        placed(&mut e);
        clock.advance(Duration::from_secs(1));
        e.on_location_update(fix(5.0, 100));
        let before = e.current_placement().unwrap().distance_to_target_m;

        clock.advance(Duration::from_secs(1));
        assert!(matches!(
            e.on_location_update(fix(40.0, 50)),
            LocationOutcome::Stale
        ));
        assert_eq!(e.current_placement().unwrap().distance_to_target_m, before);
    }

    #[test]
    fn inaccurate_fixes_are_skipped() {
        let clock = ManualClock::new(0);
        let settings = EngineSettings {
            max_fix_accuracy_m: 25.0,
            ..EngineSettings::default()
        };
        let mut e = ShotPlacementEngine::new(settings, clock.clone());
        e.create_shot_placement(target(), None, None, origin())
            .unwrap();
        clock.advance(Duration::from_secs(1));
        assert!(matches!(
            e.on_location_update(fix(5.0, 1).with_accuracy(80.0)),
            LocationOutcome::Inaccurate
        ));
        assert!(matches!(
            e.on_location_update(fix(5.0, 2).with_accuracy(8.0)),
            LocationOutcome::Updated(_)
        ));
    }

    #[test]
    fn fixes_without_accuracy_are_accepted() {
        let settings = EngineSettings::default();
        assert_eq!(settings.max_fix_accuracy_m, DEFAULT_MAX_FIX_ACCURACY_M);
        assert!(settings.accepts(&origin()));
        assert!(settings.accepts(&origin().with_accuracy(DEFAULT_MAX_FIX_ACCURACY_M)));
        assert!(!settings.accepts(&origin().with_accuracy(DEFAULT_MAX_FIX_ACCURACY_M + 1.0)));
    }

    #[test]
    fn bursts_are_coalesced_then_flushed() {
        let (mut e, clock) = engine();
        placed(&mut e);

        // Same instant as creation: inside the interval.
        assert!(matches!(
            e.on_location_update(fix(3.0, 1)),
            LocationOutcome::Coalesced
        ));
        clock.advance(Duration::from_millis(100));
        assert!(matches!(
            e.on_location_update(fix(8.0, 2)),
            LocationOutcome::Coalesced
        ));
        assert!(e.flush_pending().is_none());
        assert_eq!(e.current_placement().unwrap().position, origin());

        clock.advance(DEFAULT_COALESCE_INTERVAL);
        let flushed = e.flush_pending();
        assert!(matches!(flushed, Some(LocationOutcome::Updated(_))));
        assert_eq!(e.current_placement().unwrap().position, fix(8.0, 2));
        assert!(e.flush_pending().is_none());
    }

    #[test]
    fn flush_can_complete_the_shot() {
        let (mut e, clock) = engine();
        placed(&mut e);
        e.activate().unwrap();
        clock.advance(DEFAULT_SETTLE_DELAY);
        e.on_location_update(fix(2.0, 1));
        assert!(matches!(
            e.on_location_update(fix(12.0, 2)),
            LocationOutcome::Coalesced
        ));
        clock.advance(DEFAULT_COALESCE_INTERVAL);
        assert!(matches!(
            e.flush_pending(),
            Some(LocationOutcome::Completed(_))
        ));
        assert_eq!(e.state(), PlacementState::Inactive);
    }

    #[test]
    fn stale_recommendations_are_dropped() {
        let (mut e, _) = engine();
        let first = placed(&mut e);
        e.cancel();
        let second = placed(&mut e);
        assert!(second.generation > first.generation);

        assert_eq!(
            e.apply_club_recommendation(first.generation, Ok("9 Iron".into())),
            AdvisoryOutcome::Stale
        );
        assert_eq!(e.current_placement().unwrap().club_recommendation, None);

        assert_eq!(
            e.apply_club_recommendation(second.generation, Ok("PW".into())),
            AdvisoryOutcome::Applied
        );
        assert_eq!(
            e.current_placement().unwrap().club_recommendation.as_deref(),
            Some("PW")
        );
    }

    #[test]
    fn recommendation_after_cancel_is_dropped() {
        let (mut e, _) = engine();
        let req = placed(&mut e);
        e.cancel();
        assert_eq!(
            e.apply_club_recommendation(req.generation, Ok("PW".into())),
            AdvisoryOutcome::Stale
        );
        assert!(e.current_placement().is_none());
    }

    #[test]
    fn advisor_failure_leaves_field_untouched() {
        let (mut e, _) = engine();
        let req = placed(&mut e);
        e.apply_club_recommendation(req.generation, Ok("PW".into()));
        let outcome = e.apply_club_recommendation(
            req.generation,
            Err(EngineError::AdvisoryUnavailable {
                reason: "timeout".into(),
            }),
        );
        assert_eq!(outcome, AdvisoryOutcome::Unavailable);
        assert_eq!(
            e.current_placement().unwrap().club_recommendation.as_deref(),
            Some("PW")
        );
        assert_eq!(e.state(), PlacementState::Placed);
    }

    #[test]
    fn skill_context_without_placement_is_kept_for_the_next() {
        let (mut e, _) = engine();
        assert!(
            e.update_skill_context(SkillTier::Beginner, ShotCategory::Approach)
                .is_none()
        );
        placed(&mut e);
        let v = e.current_placement().unwrap().skill_verdict.clone().unwrap();
        assert_eq!(v.suggested_distances, vec![60, 80, 100, 120, 140]);
    }

    #[test]
    fn skill_update_does_not_touch_state() {
        let (mut e, _) = engine();
        placed(&mut e);
        e.activate().unwrap();
        let v = e
            .update_skill_context(SkillTier::Beginner, ShotCategory::Putt)
            .cloned()
            .unwrap();
        assert!(!v.is_realistic);
        assert!(v.note.is_some());
        assert_eq!(e.state(), PlacementState::Activated);
    }

    #[test]
    fn end_to_end_round_trip() {
        let (mut e, clock) = engine();
        e.update_skill_context(SkillTier::Intermediate, ShotCategory::Approach);
        e.create_shot_placement(target(), None, Some(7), origin())
            .unwrap();

        let p = e.current_placement().unwrap();
        assert!(p.distance_to_target_m > 70.0 && p.distance_to_target_m < 90.0);
        assert!(p.skill_verdict.as_ref().unwrap().is_realistic);

        e.activate().unwrap();
        clock.advance(DEFAULT_SETTLE_DELAY + Duration::from_millis(200));

        let mut completions = 0;
        for (i, meters) in [12.0, 14.0, 16.0].into_iter().enumerate() {
            clock.advance(Duration::from_secs(1));
            if let LocationOutcome::Completed(done) = e.on_location_update(fix(meters, i as i64 + 1))
            {
                completions += 1;
                assert_eq!(done.placement.hole_number, 7);
            }
        }
        assert_eq!(completions, 1);
        assert!(e.current_placement().is_none());
    }
}
