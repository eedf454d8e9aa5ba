//! Proximity actor: classifies each location fix against the course
//! directory and publishes the result when the answer changes.
//!
//! The course list is read from the cached config on every fix, so courses
//! added through the settings endpoint take effect on the next fix.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::actors::Actor;
use crate::bus::{BusReceiver, BusSender, PollError};
use crate::state::SystemState;
use fairway::proximity::classify;
use fairway::{ActorState, ActorStatus, FairwayConfig, FairwayEvent, ProximityResult};

pub struct ProximityActor;

impl Actor for ProximityActor {
    fn start(&self, state: Arc<SystemState>, sender: BusSender, receiver: BusReceiver) {
        std::thread::Builder::new()
            .name(sender.actor_id().to_string())
            .spawn(move || run(state, sender, receiver))
            .expect("failed to spawn proximity thread");
    }
}

/// Tracks the last published result so only changes go out.
#[derive(Default)]
pub(crate) struct Classifier {
    last: Option<ProximityResult>,
}

impl Classifier {
    /// Classify and return the result if it differs from the last one
    /// published. Distance changes alone do not count.
    pub(crate) fn update(
        &mut self,
        position: &fairway::Coordinate,
        config: &FairwayConfig,
    ) -> Option<ProximityResult> {
        let anchors = config.course_anchors();
        let result = classify(position, &anchors, config.engine.proximity_threshold_m());
        if self.last.as_ref().is_some_and(|last| last.same_course(&result)) {
            return None;
        }
        self.last = Some(result.clone());
        Some(result)
    }
}

fn telemetry(result: Option<&ProximityResult>, config: &FairwayConfig) -> HashMap<String, String> {
    let mut t = HashMap::from([("courses".into(), config.course.len().to_string())]);
    let on = result
        .and_then(ProximityResult::nearest_course_id)
        .map(|id| {
            config
                .course
                .get(id)
                .map_or_else(|| id.to_string(), |c| c.name.clone())
        })
        .unwrap_or_else(|| "none".into());
    t.insert("on_course".into(), on);
    t
}

fn run(state: Arc<SystemState>, sender: BusSender, mut receiver: BusReceiver) {
    let name = sender.actor_id().to_string();
    let mut classifier = Classifier::default();
    sender.emit(ActorState::new(
        ActorStatus::Connected,
        telemetry(None, &state.system.snapshot()),
    ));
    tracing::info!("proximity '{name}': started");

    loop {
        match receiver.poll() {
            Err(PollError::Shutdown) => {
                tracing::info!("proximity '{name}': shutting down");
                return;
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(50)),
            Ok(Some(msg)) => {
                let FairwayEvent::Location(fix) = msg.event else {
                    continue;
                };
                let config = state.system.snapshot();
                if let Some(result) = classifier.update(&fix.position, &config) {
                    match result.nearest_course_id() {
                        Some(id) => tracing::info!("proximity: on course '{id}'"),
                        None => tracing::info!("proximity: not on any known course"),
                    }
                    sender.emit(ActorState::new(
                        ActorStatus::Connected,
                        telemetry(Some(&result), &config),
                    ));
                    sender.emit(result);
                }
            }
        }
    }
}
