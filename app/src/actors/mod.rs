//! Actor infrastructure: the shared trait, start helper, and resolution of
//! the actor set from config.

pub mod advisor;
pub mod mock;
pub mod placement;
pub mod proximity;
pub mod system;
pub mod web;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::bus::{BusReceiver, BusSender};
use crate::state::SystemState;
use crate::state::config::{FairwayConfig, global_id};
use fairway::FairwayMessage;

/// Fixed id of the placement engine owner.
pub const PLACEMENT_ID: &str = "placement";
/// Fixed id of the course proximity classifier.
pub const PROXIMITY_ID: &str = "proximity";
/// Fixed id of the housekeeping actor, started by `main` before the rest.
pub const SYSTEM_ID: &str = "system";

// ---------------------------------------------------------------------------
// Actor trait
// ---------------------------------------------------------------------------

/// What `Actor::reconfigure()` did with a config change.
pub enum ReconfigureOutcome {
    NoChange,
    /// Picked up without a restart.
    Applied,
    /// Stop and recreate (e.g. bind address changed).
    RestartRequired,
}

/// A self-managed actor. The struct holds its construction params;
/// `start()` clones what it needs and spawns its own thread.
pub trait Actor: Send + Sync {
    fn start(&self, state: Arc<SystemState>, sender: BusSender, receiver: BusReceiver);

    /// Actors also watch their shutdown flag through
    /// `BusReceiver::is_shutdown()`, so the default does nothing.
    fn stop(&self) {}

    fn reconfigure(&self, _state: &Arc<SystemState>, _sender: &BusSender) -> ReconfigureOutcome {
        ReconfigureOutcome::NoChange
    }
}

// ---------------------------------------------------------------------------
// Actor resolution
// ---------------------------------------------------------------------------

pub struct ResolvedActor {
    pub id: String,
    pub name: String,
    pub actor: Box<dyn Actor>,
}

/// Build the full actor set for `config`: the always-on placement and
/// proximity actors plus one actor per mock location, advisor, and (when
/// `web` is set) webserver section. Invalid sections are logged and
/// skipped.
pub fn resolve_actors(config: &FairwayConfig, web: bool) -> Vec<ResolvedActor> {
    let mut actors = vec![
        ResolvedActor {
            id: PLACEMENT_ID.into(),
            name: "Shot Placement".into(),
            actor: Box::new(placement::PlacementActor::new(config)),
        },
        ResolvedActor {
            id: PROXIMITY_ID.into(),
            name: "Course Proximity".into(),
            actor: Box::new(proximity::ProximityActor),
        },
    ];

    for (index, section) in &config.mock_location {
        let id = global_id("mock_location", index);
        match mock::location::WalkingTrack::from_section(section) {
            Ok(track) => actors.push(ResolvedActor {
                id,
                name: section.name.clone(),
                actor: Box::new(mock::location::MockLocationActor { track }),
            }),
            Err(e) => tracing::warn!("location source '{id}': {e}, skipped"),
        }
    }

    for (index, section) in &config.advisor {
        let id = global_id("advisor", index);
        actors.push(ResolvedActor {
            id,
            name: section.name.clone(),
            actor: Box::new(advisor::AdvisorActor::new(
                Duration::from_millis(section.latency_ms.unwrap_or(advisor::DEFAULT_LATENCY_MS)),
                section.fail_every,
            )),
        });
    }

    if web {
        for (index, ws) in &config.webserver {
            let id = global_id("webserver", index);
            match ws.bind.parse::<SocketAddr>() {
                Ok(addr) => actors.push(ResolvedActor {
                    id,
                    name: ws.name.clone(),
                    actor: Box::new(web::WebActor::new(addr)),
                }),
                Err(e) => {
                    tracing::warn!("webserver '{id}': invalid bind address '{}': {e}", ws.bind);
                }
            }
        }
    }

    actors
}

/// Wire up bus handles, start the actor, and register it.
pub fn start_actor(
    id: String,
    actor: Box<dyn Actor>,
    state: &Arc<SystemState>,
    bus_tx: &broadcast::Sender<FairwayMessage>,
) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let sender = BusSender::new(id.clone(), bus_tx.clone(), Arc::clone(&shutdown));
    let receiver = sender.subscribe();
    actor.start(Arc::clone(state), sender, receiver);
    state.register_actor(id, actor, shutdown);
}

/// Actor id to display name, for the status endpoint.
pub fn actor_names(config: &FairwayConfig) -> HashMap<String, String> {
    let mut names = HashMap::from([
        (SYSTEM_ID.to_string(), "System".to_string()),
        (PLACEMENT_ID.to_string(), "Shot Placement".to_string()),
        (PROXIMITY_ID.to_string(), "Course Proximity".to_string()),
    ]);
    for (index, section) in &config.mock_location {
        names.insert(global_id("mock_location", index), section.name.clone());
    }
    for (index, section) in &config.advisor {
        names.insert(global_id("advisor", index), section.name.clone());
    }
    for (index, ws) in &config.webserver {
        names.insert(global_id("webserver", index), ws.name.clone());
    }
    names
}
