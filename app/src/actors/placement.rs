//! Placement actor: the single owner of `ShotPlacementEngine`.
//!
//! Runs on its own thread and drains the bus in order, so every engine call
//! is serialized. Commands carrying a `request_id` get a `PlacementOutcome`
//! back. Every observable change goes out as a `PlacementSnapshot`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::actors::{Actor, ReconfigureOutcome};
use crate::bus::{BusReceiver, BusSender, PollError};
use crate::state::SystemState;
use fairway::{
    ActorState, ActorStatus, AdvisoryOutcome, AlertLevel, AlertMessage, ClubRecommendation,
    Clock, EngineError, EngineSettings, FairwayConfig, FairwayEvent, LocationOutcome,
    PlacementAction, PlacementCommand, PlacementOutcome, PlacementSnapshot, PlayerSection,
    ShotPlacement, ShotPlacementEngine, SkillContext,
};

/// Poll interval; also the cadence at which coalesced fixes are flushed.
pub const TICK: Duration = Duration::from_millis(100);

/// Changes handed to the running thread by `reconfigure()`.
#[derive(Debug, Default)]
pub(crate) struct PendingChanges {
    pub settings: Option<EngineSettings>,
    pub player: Option<PlayerSection>,
}

pub struct PlacementActor {
    settings: Mutex<EngineSettings>,
    player: Mutex<Option<PlayerSection>>,
    pending: Arc<Mutex<PendingChanges>>,
}

impl PlacementActor {
    pub fn new(config: &FairwayConfig) -> Self {
        Self {
            settings: Mutex::new(config.engine.settings()),
            player: Mutex::new(config.player),
            pending: Arc::new(Mutex::new(PendingChanges::default())),
        }
    }
}

impl Actor for PlacementActor {
    fn start(&self, _state: Arc<SystemState>, sender: BusSender, receiver: BusReceiver) {
        let settings = self
            .settings
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let engine = ShotPlacementEngine::with_system_clock(settings);
        let player = *self.player.lock().unwrap_or_else(|e| e.into_inner());
        let pending = Arc::clone(&self.pending);

        std::thread::Builder::new()
            .name(sender.actor_id().to_string())
            .spawn(move || run(engine, player, pending, sender, receiver))
            .expect("failed to spawn placement thread");
    }

    /// Engine tunables and the player's skill context are swapped in place;
    /// the in-flight placement survives. Dropping `[player]` keeps whatever
    /// context the engine already has.
    fn reconfigure(&self, state: &Arc<SystemState>, _sender: &BusSender) -> ReconfigureOutcome {
        let snap = state.system.snapshot();
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let mut outcome = ReconfigureOutcome::NoChange;

        let next = snap.engine.settings();
        let mut settings = self.settings.lock().unwrap_or_else(|e| e.into_inner());
        if *settings != next {
            *settings = next.clone();
            pending.settings = Some(next);
            outcome = ReconfigureOutcome::Applied;
        }

        let mut player = self.player.lock().unwrap_or_else(|e| e.into_inner());
        if *player != snap.player {
            *player = snap.player;
            if let Some(p) = snap.player {
                pending.player = Some(p);
                outcome = ReconfigureOutcome::Applied;
            }
        }
        outcome
    }
}

fn telemetry<C: Clock>(engine: &ShotPlacementEngine<C>, completed: u32) -> HashMap<String, String> {
    let mut t = HashMap::from([
        ("state".into(), engine.state().to_string()),
        ("completed_shots".into(), completed.to_string()),
    ]);
    if let Some(p) = engine.current_placement() {
        t.insert("hole".into(), p.hole_number.to_string());
        t.insert("generation".into(), p.generation.to_string());
    }
    if let Some(skill) = engine.skill_context() {
        t.insert("skill".into(), format!("{} {}", skill.tier, skill.category));
    }
    t
}

fn snapshot<C: Clock>(engine: &ShotPlacementEngine<C>) -> PlacementSnapshot {
    PlacementSnapshot::of(engine.current_placement()).with_skill(engine.skill_context())
}

pub(crate) fn run<C: Clock>(
    mut engine: ShotPlacementEngine<C>,
    player: Option<PlayerSection>,
    pending: Arc<Mutex<PendingChanges>>,
    sender: BusSender,
    mut receiver: BusReceiver,
) {
    let name = sender.actor_id().to_string();
    if let Some(p) = player {
        engine.update_skill_context(p.tier, p.category);
    }
    let mut completed = 0u32;

    sender.emit(ActorState::new(
        ActorStatus::Connected,
        telemetry(&engine, completed),
    ));
    sender.emit(snapshot(&engine));
    tracing::info!("placement '{name}': started");

    loop {
        let before = engine.state();
        loop {
            match receiver.poll() {
                Err(PollError::Shutdown) => {
                    tracing::info!("placement '{name}': shutting down");
                    sender.emit(ActorState::new(ActorStatus::Disconnected, HashMap::new()));
                    return;
                }
                Ok(None) => break,
                Ok(Some(msg)) => match msg.event {
                    FairwayEvent::Location(fix) => {
                        let skill = engine.skill_context();
                        let outcome = engine.on_location_update(fix.position);
                        completed += publish(&sender, outcome, skill);
                    }
                    FairwayEvent::PlacementCommand(cmd) => {
                        handle_command(&mut engine, cmd, &sender);
                    }
                    FairwayEvent::ClubRecommendation(rec) => {
                        handle_recommendation(&mut engine, rec, &sender);
                    }
                    _ => {}
                },
            }
        }

        let changes = std::mem::take(&mut *pending.lock().unwrap_or_else(|e| e.into_inner()));
        if let Some(settings) = changes.settings {
            tracing::info!("placement '{name}': engine settings updated");
            engine.set_settings(settings);
        }
        if let Some(p) = changes.player {
            tracing::info!("placement '{name}': skill context now {} {}", p.tier, p.category);
            engine.update_skill_context(p.tier, p.category);
            sender.emit(snapshot(&engine));
        }
        let skill = engine.skill_context();
        if let Some(outcome) = engine.flush_pending() {
            completed += publish(&sender, outcome, skill);
        }
        if engine.state() != before {
            sender.emit(ActorState::new(
                ActorStatus::Connected,
                telemetry(&engine, completed),
            ));
        }

        std::thread::sleep(TICK);
    }
}

/// Emit the snapshots a location outcome calls for. Returns 1 when a shot
/// completed.
fn publish(
    sender: &BusSender,
    outcome: LocationOutcome<'_>,
    skill: Option<SkillContext>,
) -> u32 {
    match outcome {
        LocationOutcome::Updated(p) => {
            sender.emit(PlacementSnapshot::of(Some(p)).with_skill(skill));
            0
        }
        LocationOutcome::Completed(shot) => {
            tracing::info!(
                "placement {}: shot complete, {:.1}m played, {:.1}m from target",
                shot.placement.id,
                shot.shot_distance_m,
                shot.target_miss_m
            );
            sender.emit(PlacementSnapshot::completed(shot));
            sender.emit(PlacementSnapshot::of(None).with_skill(skill));
            1
        }
        LocationOutcome::Stale => {
            tracing::debug!("placement: out-of-order fix ignored");
            0
        }
        LocationOutcome::Inaccurate => {
            tracing::debug!("placement: low-accuracy fix ignored");
            0
        }
        LocationOutcome::Idle | LocationOutcome::Coalesced => 0,
    }
}

fn handle_command<C: Clock>(
    engine: &mut ShotPlacementEngine<C>,
    cmd: PlacementCommand,
    sender: &BusSender,
) {
    let action = cmd.action.to_string();
    let result: Result<Option<ShotPlacement>, EngineError> = match cmd.action {
        PlacementAction::Create {
            target,
            pin,
            hole_number,
            position,
        } => engine
            .create_shot_placement(target, pin, hole_number, position)
            .map(|request| {
                sender.emit(request);
                engine.current_placement().cloned()
            }),
        PlacementAction::Activate => engine.activate().map(|p| Some(p.clone())),
        PlacementAction::Cancel => {
            engine.cancel();
            Ok(None)
        }
        PlacementAction::UpdateSkillContext { tier, category } => {
            engine.update_skill_context(tier, category);
            Ok(engine.current_placement().cloned())
        }
    };

    match &result {
        Ok(placement) => sender.emit(
            PlacementSnapshot::of(placement.as_ref()).with_skill(engine.skill_context()),
        ),
        Err(e) => tracing::info!("placement: {action} rejected: {e}"),
    }

    if let Some(request_id) = cmd.request_id {
        let (placement, error) = match result {
            Ok(p) => (p, None),
            Err(e) => (engine.current_placement().cloned(), Some(e)),
        };
        sender.emit(PlacementOutcome {
            request_id,
            placement,
            error,
        });
    }
}

fn handle_recommendation<C: Clock>(
    engine: &mut ShotPlacementEngine<C>,
    rec: ClubRecommendation,
    sender: &BusSender,
) {
    let generation = rec.generation;
    match engine.apply_club_recommendation(generation, rec.into_result()) {
        AdvisoryOutcome::Applied => {
            sender.emit(snapshot(engine));
        }
        AdvisoryOutcome::Unavailable => {
            sender.emit(AlertMessage {
                level: AlertLevel::Warn,
                message: "club recommendation unavailable".into(),
            });
        }
        AdvisoryOutcome::Stale => {}
    }
}
