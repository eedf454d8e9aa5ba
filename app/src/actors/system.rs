//! System actor: always-on housekeeping.
//!
//! Holds the only `RoundStateWriter` and keeps it current from location,
//! placement and proximity events. Also applies `ConfigCommand`s
//! and reconciles the running actor set against the new config.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use crate::actors::{
    Actor, ReconfigureOutcome, ResolvedActor, SYSTEM_ID, resolve_actors, start_actor,
};
use crate::bus::{BusReceiver, BusSender, PollError};
use crate::state::{RoundStateWriter, SystemState};
use fairway::{
    ConfigAction, ConfigCommand, ConfigOutcome, EngineSettings, FairwayConfig, FairwayEvent,
    FairwayMessage,
};

/// Grace period between stopping an actor and starting its replacement,
/// so a restarted webserver can rebind its port.
const RESTART_GAP: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Config reload
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub(crate) struct ConfigReloadOutcome {
    pub applied: Vec<String>,
    pub restarted: Vec<String>,
    pub stopped: Vec<String>,
    pub started: Vec<String>,
}

/// Reconcile running actors with the cached config.
///
/// Actors no longer expected are stopped, surviving ones are asked to
/// `reconfigure()` (restarting when they say so), and new ones are started.
/// With `scope = Some(id)` only that actor is considered.
pub(crate) fn apply_config_reload(
    state: &Arc<SystemState>,
    bus_tx: &broadcast::Sender<FairwayMessage>,
    scope: Option<&str>,
) -> ConfigReloadOutcome {
    let snap = state.system.snapshot();
    let mut resolved: HashMap<String, ResolvedActor> = resolve_actors(&snap, state.web_enabled)
        .into_iter()
        .map(|ra| (ra.id.clone(), ra))
        .collect();

    let mut ids: Vec<String> = state
        .actor_ids()
        .into_iter()
        .chain(resolved.keys().cloned())
        .filter(|id| id != SYSTEM_ID && scope.is_none_or(|s| s == id))
        .collect();
    ids.sort();
    ids.dedup();

    let mut result = ConfigReloadOutcome::default();
    for id in ids {
        let running = state.is_registered(&id);
        match resolved.remove(&id) {
            None if running => {
                tracing::info!("config reload: stopping removed actor '{id}'");
                state.stop_actor(&id);
                state.remove_actor(&id);
                result.stopped.push(id);
            }
            None => {}
            Some(ra) if !running => {
                tracing::info!("config reload: starting new actor '{id}'");
                start_actor(ra.id, ra.actor, state, bus_tx);
                result.started.push(id);
            }
            Some(ra) => {
                let sender =
                    BusSender::new(id.clone(), bus_tx.clone(), Arc::new(AtomicBool::new(false)));
                match state.reconfigure_actor(&id, state, &sender) {
                    Some(ReconfigureOutcome::Applied) => {
                        tracing::info!("config reload: applied in-place for '{id}'");
                        result.applied.push(id);
                    }
                    Some(ReconfigureOutcome::RestartRequired) => {
                        tracing::info!("config reload: restarting '{id}'");
                        state.stop_actor(&id);
                        state.remove_actor(&id);
                        std::thread::sleep(RESTART_GAP);
                        start_actor(ra.id, ra.actor, state, bus_tx);
                        result.restarted.push(id);
                    }
                    Some(ReconfigureOutcome::NoChange) | None => {}
                }
            }
        }
    }
    result
}

// ---------------------------------------------------------------------------
// System actor
// ---------------------------------------------------------------------------

/// Not config-driven; `main` starts it before anything else so no event is
/// missed.
pub struct SystemActor {
    writer: Mutex<Option<RoundStateWriter>>,
    bus_tx: broadcast::Sender<FairwayMessage>,
    ready_tx: Mutex<Option<std_mpsc::SyncSender<()>>>,
}

impl SystemActor {
    pub fn new(
        writer: RoundStateWriter,
        bus_tx: broadcast::Sender<FairwayMessage>,
    ) -> (Self, std_mpsc::Receiver<()>) {
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);
        let actor = Self {
            writer: Mutex::new(Some(writer)),
            bus_tx,
            ready_tx: Mutex::new(Some(ready_tx)),
        };
        (actor, ready_rx)
    }
}

impl Actor for SystemActor {
    fn start(&self, state: Arc<SystemState>, sender: BusSender, receiver: BusReceiver) {
        let Some(writer) = self.writer.lock().unwrap_or_else(|e| e.into_inner()).take() else {
            tracing::error!("system actor started twice, ignoring");
            return;
        };
        let ready_tx = self.ready_tx.lock().unwrap_or_else(|e| e.into_inner()).take();
        let bus_tx = self.bus_tx.clone();

        std::thread::Builder::new()
            .name(SYSTEM_ID.into())
            .spawn(move || {
                if let Some(tx) = ready_tx {
                    let _ = tx.send(());
                }
                run(writer, state, bus_tx, sender, receiver)
            })
            .expect("failed to spawn system thread");
    }
}

fn run(
    writer: RoundStateWriter,
    state: Arc<SystemState>,
    bus_tx: broadcast::Sender<FairwayMessage>,
    sender: BusSender,
    mut receiver: BusReceiver,
) {
    // Config only changes through this thread, so the copy stays current.
    let mut settings = state.system.snapshot().engine.settings();
    loop {
        match receiver.poll() {
            Err(PollError::Shutdown) => return,
            Ok(None) => std::thread::sleep(Duration::from_millis(50)),
            Ok(Some(msg)) => {
                if let FairwayEvent::ConfigCommand(cmd) = &msg.event {
                    handle_config_command(cmd, &state, &bus_tx, &sender);
                    settings = state.system.snapshot().engine.settings();
                } else {
                    record(&writer, msg.event, &settings);
                }
            }
        }
    }
}

/// Fold one bus event into the round state.
///
/// Fixes go through the same accuracy and ordering checks the engine
/// applies, since the last fix becomes the origin of the next shot.
fn record(writer: &RoundStateWriter, event: FairwayEvent, settings: &EngineSettings) {
    match event {
        FairwayEvent::Location(fix) => {
            if !writer.offer_position(fix.position, settings) {
                tracing::debug!("round state: stale or imprecise fix not kept");
            }
        }
        FairwayEvent::PlacementSnapshot(snapshot) => {
            if let Some(skill) = snapshot.skill {
                writer.set_skill(skill);
            }
            match snapshot.completed {
                Some(shot) => writer.set_completed(shot),
                None => writer.set_placement(snapshot.placement),
            }
        }
        FairwayEvent::Proximity(result) => writer.set_proximity(result),
        _ => {}
    }
}

/// Drop the section named by a global id ("course.0", "advisor.1").
/// Returns false when nothing matched.
fn remove_section(config: &mut FairwayConfig, id: &str) -> bool {
    let Some((prefix, index)) = id.split_once('.') else {
        return false;
    };
    match prefix {
        "course" => config.course.remove(index).is_some(),
        "mock_location" => config.mock_location.remove(index).is_some(),
        "advisor" => config.advisor.remove(index).is_some(),
        "webserver" => config.webserver.remove(index).is_some(),
        _ => false,
    }
}

fn handle_config_command(
    cmd: &ConfigCommand,
    state: &Arc<SystemState>,
    bus_tx: &broadcast::Sender<FairwayMessage>,
    sender: &BusSender,
) {
    let scope: Option<String> = match &cmd.action {
        ConfigAction::ReplaceAll { config } => {
            state.system.replace(config.clone());
            None
        }
        ConfigAction::UpsertCourse { index, section } => {
            state.system.update(|c| {
                c.course.insert(index.clone(), section.clone());
            });
            // Read live by the proximity actor; nothing to restart.
            Some(format!("course.{index}"))
        }
        ConfigAction::Remove { id } => {
            let mut removed = false;
            state.system.update(|c| removed = remove_section(c, id));
            if !removed {
                tracing::warn!("config remove: no section '{id}'");
            }
            // Still answered: the reload below finds nothing to do.
            Some(id.clone())
        }
    };

    let result = apply_config_reload(state, bus_tx, scope.as_deref());
    tracing::debug!(
        "config reload: applied {:?}, restarted {:?}, stopped {:?}, started {:?}",
        result.applied,
        result.restarted,
        result.stopped,
        result.started
    );

    if let Some(request_id) = &cmd.request_id {
        sender.emit(ConfigOutcome {
            request_id: request_id.clone(),
            restarted: result.restarted,
            stopped: result.stopped,
            started: result.started,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::RoundState;
    use fairway::{
        AdvisorSection, Coordinate, CourseSection, LocationFix, NearestCourse, PlacementAction,
        PlacementSnapshot, PlayerSection, ProximityResult, ShotCategory, SkillContext, SkillTier,
    };

    fn test_state(dir: &tempfile::TempDir) -> Arc<SystemState> {
        let (state, _writer) = SystemState::new(dir.path().join("config.toml"), false);
        let state = Arc::new(state);
        state.system.update(|c| {
            c.mock_location.clear();
            c.advisor.clear();
        });
        state
    }

    fn table_advisor() -> AdvisorSection {
        AdvisorSection {
            name: "Table".into(),
            latency_ms: Some(5),
            fail_every: None,
        }
    }

    fn stop_all(state: &SystemState) {
        for id in state.actor_ids() {
            state.stop_actor(&id);
        }
    }

    /// Send one config command through the handler and return its outcome.
    fn config_round_trip(
        state: &Arc<SystemState>,
        bus_tx: &broadcast::Sender<FairwayMessage>,
        request_id: &str,
        action: ConfigAction,
    ) -> ConfigOutcome {
        let mut rx = bus_tx.subscribe();
        let sender = BusSender::new(
            SYSTEM_ID.into(),
            bus_tx.clone(),
            Arc::new(AtomicBool::new(false)),
        );
        let cmd = ConfigCommand {
            request_id: Some(request_id.into()),
            action,
        };
        handle_config_command(&cmd, state, bus_tx, &sender);
        while let Ok(msg) = rx.try_recv() {
            if let FairwayEvent::ConfigOutcome(outcome) = msg.event
                && outcome.request_id == request_id
            {
                return outcome;
            }
        }
        panic!("no config outcome for {request_id}");
    }

    #[test]
    fn events_fold_into_round_state() {
        let (round, writer) = RoundState::new();
        let settings = EngineSettings::default();
        let here = Coordinate::new(55.0209, -7.2479).unwrap();

        record(&writer, LocationFix { position: here }.into(), &settings);
        record(
            &writer,
            PlacementSnapshot::of(None)
                .with_skill(Some(SkillContext {
                    tier: SkillTier::Beginner,
                    category: ShotCategory::Chip,
                }))
                .into(),
            &settings,
        );
        record(
            &writer,
            ProximityResult {
                nearest: Some(NearestCourse {
                    course_id: "0".into(),
                    distance_meters: 12.0,
                }),
                ..Default::default()
            }
            .into(),
            &settings,
        );

        let snap = round.snapshot();
        assert_eq!(snap.last_position, Some(here));
        assert_eq!(snap.skill.unwrap().tier, SkillTier::Beginner);
        assert_eq!(snap.proximity.unwrap().nearest_course_id(), Some("0"));
    }

    #[test]
    fn skill_follows_what_the_engine_reports() {
        let (round, writer) = RoundState::new();
        let settings = EngineSettings::default();
        let beginner = SkillContext {
            tier: SkillTier::Beginner,
            category: ShotCategory::Approach,
        };
        record(
            &writer,
            PlacementSnapshot::of(None).with_skill(Some(beginner)).into(),
            &settings,
        );

        // A command is only a request; the snapshot that follows it counts.
        record(
            &writer,
            PlacementAction::UpdateSkillContext {
                tier: SkillTier::Professional,
                category: ShotCategory::Drive,
            }
            .into(),
            &settings,
        );
        record(&writer, PlacementSnapshot::of(None).into(), &settings);
        assert_eq!(round.snapshot().skill, Some(beginner));
    }

    #[test]
    fn older_or_imprecise_fixes_keep_the_last_origin() {
        let (round, writer) = RoundState::new();
        let settings = EngineSettings::default();
        let fix = |ms: i64, accuracy: f64| LocationFix {
            position: Coordinate::fix(55.0209, -7.2479, Some(accuracy), ms).unwrap(),
        };

        record(&writer, fix(2000, 3.0).into(), &settings);
        record(&writer, fix(1000, 3.0).into(), &settings);
        record(&writer, fix(2500, 400.0).into(), &settings);

        let last = round.last_position().unwrap();
        assert_eq!(last.captured_at_millis(), 2000);
        assert_eq!(last.accuracy_meters(), Some(3.0));
    }

    #[test]
    fn reload_starts_and_stops_to_match_config() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let bus_tx = crate::bus::channel();

        let first = apply_config_reload(&state, &bus_tx, None);
        assert_eq!(first.started, vec!["placement", "proximity"]);

        state.system.update(|c| {
            c.advisor.insert("0".into(), table_advisor());
        });
        let second = apply_config_reload(&state, &bus_tx, None);
        assert_eq!(second.started, vec!["advisor.0"]);
        assert!(second.stopped.is_empty());

        state.system.update(|c| {
            c.advisor.clear();
            c.engine.settle_delay_ms = 1000;
        });
        let third = apply_config_reload(&state, &bus_tx, None);
        assert_eq!(third.stopped, vec!["advisor.0"]);
        assert_eq!(third.applied, vec!["placement"]);

        stop_all(&state);
    }

    #[test]
    fn player_change_is_applied_to_placement() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let bus_tx = crate::bus::channel();
        apply_config_reload(&state, &bus_tx, None);

        state.system.update(|c| {
            c.player = Some(PlayerSection {
                tier: SkillTier::Beginner,
                category: ShotCategory::Chip,
            });
        });
        let changed = apply_config_reload(&state, &bus_tx, None);
        assert_eq!(changed.applied, vec!["placement"]);
        assert!(changed.restarted.is_empty());

        let unchanged = apply_config_reload(&state, &bus_tx, None);
        assert!(unchanged.applied.is_empty());

        stop_all(&state);
    }

    #[test]
    fn course_commands_edit_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let bus_tx = crate::bus::channel();
        let section = CourseSection {
            name: "Links".into(),
            latitude: 55.0209,
            longitude: -7.2479,
        };

        let added = config_round_trip(
            &state,
            &bus_tx,
            "add",
            ConfigAction::UpsertCourse {
                index: "links".into(),
                section: section.clone(),
            },
        );
        assert!(added.started.is_empty() && added.stopped.is_empty());
        assert_eq!(state.system.snapshot().course.get("links"), Some(&section));

        config_round_trip(
            &state,
            &bus_tx,
            "drop",
            ConfigAction::Remove {
                id: "course.links".into(),
            },
        );
        assert!(!state.system.snapshot().course.contains_key("links"));

        let unknown = config_round_trip(
            &state,
            &bus_tx,
            "nothing",
            ConfigAction::Remove { id: "hole.9".into() },
        );
        assert!(unknown.stopped.is_empty());
    }

    #[test]
    fn removing_a_running_section_stops_its_actor() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        let bus_tx = crate::bus::channel();
        state.system.update(|c| {
            c.advisor.insert("0".into(), table_advisor());
        });
        apply_config_reload(&state, &bus_tx, None);
        assert!(state.is_registered("advisor.0"));

        let outcome = config_round_trip(
            &state,
            &bus_tx,
            "rm",
            ConfigAction::Remove {
                id: "advisor.0".into(),
            },
        );
        assert_eq!(outcome.stopped, vec!["advisor.0"]);
        assert!(!state.is_registered("advisor.0"));
        assert!(state.system.snapshot().advisor.is_empty());

        stop_all(&state);
    }
}
