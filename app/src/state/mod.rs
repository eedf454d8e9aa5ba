pub mod config;
mod round;

pub use round::{RoundSnapshot, RoundState, RoundStateWriter};

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::actors::{Actor, ReconfigureOutcome};
use crate::bus::BusSender;
use config::SystemConfig;

/// Root of all shared runtime state, handed to actors as `Arc<SystemState>`.
pub struct SystemState {
    pub system: SystemConfig,
    pub round: RoundState,
    /// False under `--no-web`: webserver sections stay in the file but
    /// are never started.
    pub web_enabled: bool,
    actors: RwLock<HashMap<String, (Box<dyn Actor>, Arc<AtomicBool>)>>,
}

impl SystemState {
    pub fn new(config_path: PathBuf, web_enabled: bool) -> (Self, RoundStateWriter) {
        let (round, writer) = RoundState::new();
        (
            Self {
                system: SystemConfig::new(config_path),
                round,
                web_enabled,
                actors: RwLock::new(HashMap::new()),
            },
            writer,
        )
    }

    // ----- Actor registry -----

    pub fn register_actor(&self, id: String, actor: Box<dyn Actor>, shutdown: Arc<AtomicBool>) {
        self.actors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, (actor, shutdown));
    }

    pub fn actor_ids(&self) -> Vec<String> {
        self.actors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn is_registered(&self, id: &str) -> bool {
        self.actors
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    /// `None` if `id` is not registered.
    pub fn reconfigure_actor(
        &self,
        id: &str,
        state: &Arc<SystemState>,
        sender: &BusSender,
    ) -> Option<ReconfigureOutcome> {
        let guard = self.actors.read().unwrap_or_else(|e| e.into_inner());
        guard.get(id).map(|(a, _)| a.reconfigure(state, sender))
    }

    /// Raise the actor's shutdown flag and call `stop()`.
    pub fn stop_actor(&self, id: &str) {
        let guard = self.actors.read().unwrap_or_else(|e| e.into_inner());
        if let Some((actor, shutdown)) = guard.get(id) {
            shutdown.store(true, Ordering::Relaxed);
            actor.stop();
        }
    }

    pub fn remove_actor(&self, id: &str) -> Option<Box<dyn Actor>> {
        self.actors
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id)
            .map(|(a, _)| a)
    }
}
