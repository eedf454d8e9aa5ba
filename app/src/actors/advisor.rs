//! Club-recommendation service.
//!
//! Answers `ClubRecommendationRequest` events from a carry-distance table.
//! Each request is served on its own tokio task after a configured latency,
//! so answers can arrive after the placement they were asked for is gone;
//! the placement actor drops those by generation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};

use crate::actors::{Actor, ReconfigureOutcome};
use crate::bus::{BusReceiver, BusSender};
use crate::state::SystemState;
use fairway::units::meters_to_yards;
use fairway::{
    ActorState, ActorStatus, Club, ClubRecommendation, ClubRequest, FairwayEvent, FairwayMessage,
};

pub const DEFAULT_LATENCY_MS: u64 = 400;

pub struct AdvisorActor {
    latency: Duration,
    fail_every: Option<u32>,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl AdvisorActor {
    pub fn new(latency: Duration, fail_every: Option<u32>) -> Self {
        Self {
            latency,
            fail_every,
            shutdown_tx: Mutex::new(None),
        }
    }
}

impl Actor for AdvisorActor {
    fn start(&self, _state: Arc<SystemState>, sender: BusSender, _receiver: BusReceiver) {
        let latency = self.latency;
        let fail_every = self.fail_every;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *self.shutdown_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(shutdown_tx);

        std::thread::Builder::new()
            .name(sender.actor_id().to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Runtime::new() {
                    Ok(rt) => rt,
                    Err(e) => {
                        tracing::error!("advisor '{}': no runtime: {e}", sender.actor_id());
                        sender.emit(ActorState::new(ActorStatus::Disconnected, HashMap::new()));
                        return;
                    }
                };
                rt.block_on(run(latency, fail_every, sender, shutdown_rx));
            })
            .expect("failed to spawn advisor thread");
    }

    fn stop(&self) {
        if let Some(tx) = self
            .shutdown_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            let _ = tx.send(());
        }
    }

    fn reconfigure(&self, state: &Arc<SystemState>, sender: &BusSender) -> ReconfigureOutcome {
        let snap = state.system.snapshot();
        let index = sender.actor_id().strip_prefix("advisor.").unwrap_or("0");
        match snap.advisor.get(index) {
            Some(section)
                if section.latency_ms.unwrap_or(DEFAULT_LATENCY_MS)
                    == self.latency.as_millis() as u64
                    && section.fail_every == self.fail_every =>
            {
                ReconfigureOutcome::NoChange
            }
            _ => ReconfigureOutcome::RestartRequired,
        }
    }
}

/// Table lookup: the club that carries the requested distance.
pub fn recommend(request: &ClubRequest) -> Club {
    Club::for_carry_yards(meters_to_yards(request.distance_m))
}

/// `fail_every = n` fails the n-th, 2n-th, ... request.
fn should_fail(served: u64, fail_every: Option<u32>) -> bool {
    fail_every.is_some_and(|n| n > 0 && served % u64::from(n) == 0)
}

async fn run(
    latency: Duration,
    fail_every: Option<u32>,
    sender: BusSender,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let name = sender.actor_id().to_string();
    let served = Arc::new(AtomicU64::new(0));
    let mut bus_rx = sender.raw_sender().subscribe();
    let status = |served: u64| {
        ActorState::new(
            ActorStatus::Connected,
            HashMap::from([
                ("latency_ms".into(), latency.as_millis().to_string()),
                ("served".into(), served.to_string()),
            ]),
        )
    };
    sender.emit(status(0));
    tracing::info!("advisor '{name}': started ({latency:?} latency)");

    loop {
        let msg: FairwayMessage = tokio::select! {
            _ = &mut shutdown_rx => break,
            recv = bus_rx.recv() => match recv {
                Ok(msg) => msg,
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("advisor '{name}': lagged, dropped {n} events");
                    continue;
                }
            },
        };
        let FairwayEvent::ClubRecommendationRequest(request) = msg.event else {
            continue;
        };

        let n = served.fetch_add(1, Ordering::Relaxed) + 1;
        let fail = should_fail(n, fail_every);
        let sender = sender.clone();
        let report = status(n);
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            let (club, error) = if fail {
                (None, Some("advisor unavailable".to_string()))
            } else {
                (Some(recommend(&request).name().to_string()), None)
            };
            tracing::debug!(
                "advisor: gen {} at {:.0}m -> {:?}",
                request.generation,
                request.distance_m,
                club
            );
            sender.emit(ClubRecommendation {
                placement_id: request.placement_id,
                generation: request.generation,
                club,
                error,
            });
            sender.emit(report);
        });
    }

    tracing::info!("advisor '{name}': shutting down");
    sender.emit(ActorState::new(ActorStatus::Disconnected, HashMap::new()));
}
