//! Simulated GPS source: walks a straight line from a start point and
//! publishes a noisy fix at a fixed interval.
//!
//! Useful for exercising placement completion and course proximity without
//! a phone in a pocket.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::actors::Actor;
use crate::bus::{BusReceiver, BusSender, PollError};
use crate::state::SystemState;
use fairway::geo::destination;
use fairway::{
    ActorState, ActorStatus, Coordinate, EngineError, LocationFix, MockLocationSection,
};

const DEFAULT_WALK_SPEED_MPS: f64 = 1.2;
const DEFAULT_INTERVAL_MS: u64 = 1000;
/// Accuracy reported when the section sets no jitter (m).
const BASE_ACCURACY_M: f64 = 3.0;

/// Straight-line walk, validated from its config section.
#[derive(Debug, Clone)]
pub struct WalkingTrack {
    pub start: Coordinate,
    pub heading_deg: f64,
    pub speed_mps: f64,
    pub interval: Duration,
    pub jitter_m: f64,
}

impl WalkingTrack {
    pub fn from_section(section: &MockLocationSection) -> Result<Self, EngineError> {
        let start = Coordinate::new(section.start_latitude, section.start_longitude)?;
        Ok(Self {
            start,
            heading_deg: section.heading_deg,
            speed_mps: section
                .walk_speed_mps
                .unwrap_or(DEFAULT_WALK_SPEED_MPS)
                .max(0.0),
            interval: Duration::from_millis(
                section.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS).max(50),
            ),
            jitter_m: section.jitter.map_or(0.0, |d| d.as_meters().max(0.0)),
        })
    }

    /// True position after walking for `elapsed`.
    pub fn position_at(&self, elapsed: Duration) -> Coordinate {
        destination(
            &self.start,
            self.heading_deg,
            self.speed_mps * elapsed.as_secs_f64(),
        )
    }
}

/// Linear congruential step; plenty for GPS noise.
fn next_rand(seed: &mut u64) -> f64 {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    (*seed >> 11) as f64 / (1u64 << 53) as f64
}

/// Offset `position` by up to `jitter_m` in a random direction.
fn add_noise(position: Coordinate, jitter_m: f64, seed: &mut u64) -> Coordinate {
    if jitter_m <= 0.0 {
        return position;
    }
    let bearing = next_rand(seed) * 360.0;
    let offset = next_rand(seed) * jitter_m;
    destination(&position, bearing, offset)
}

pub struct MockLocationActor {
    pub track: WalkingTrack,
}

impl Actor for MockLocationActor {
    fn start(&self, _state: Arc<SystemState>, sender: BusSender, receiver: BusReceiver) {
        let track = self.track.clone();
        let thread_name = format!("location:{}", sender.actor_id());

        std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || run(track, sender, receiver))
            .expect("failed to spawn mock location thread");
    }
}

fn telemetry(track: &WalkingTrack, fixes: u64, walked_m: f64) -> HashMap<String, String> {
    HashMap::from([
        ("source".into(), "simulated walk".into()),
        ("fixes".into(), fixes.to_string()),
        ("heading".into(), format!("{:.0}", track.heading_deg)),
        ("walked_m".into(), format!("{walked_m:.0}")),
    ])
}

fn run(track: WalkingTrack, sender: BusSender, mut receiver: BusReceiver) {
    let name = sender.actor_id().to_string();
    let started = Instant::now();
    let mut seed = Utc::now().timestamp_nanos_opt().unwrap_or_default() as u64;
    let mut fixes: u64 = 0;
    let mut next_fix = started;
    let accuracy = BASE_ACCURACY_M.max(track.jitter_m);

    sender.emit(ActorState::new(
        ActorStatus::Connected,
        telemetry(&track, fixes, 0.0),
    ));
    tracing::info!(
        "mock location '{name}': walking {:.0} deg at {:.1}m/s",
        track.heading_deg,
        track.speed_mps
    );

    loop {
        // Only the shutdown flag matters here; the bus is not read.
        loop {
            match receiver.poll() {
                Err(PollError::Shutdown) => {
                    tracing::info!("mock location '{name}': shutting down");
                    sender.emit(ActorState::new(ActorStatus::Disconnected, HashMap::new()));
                    return;
                }
                Ok(None) => break,
                Ok(Some(_)) => {}
            }
        }

        if Instant::now() >= next_fix {
            let elapsed = started.elapsed();
            let position = add_noise(track.position_at(elapsed), track.jitter_m, &mut seed)
                .with_accuracy(accuracy)
                .captured_at(Utc::now().timestamp_millis());
            sender.emit(LocationFix { position });
            fixes += 1;
            next_fix += track.interval;

            if fixes % 10 == 0 {
                sender.emit(ActorState::new(
                    ActorStatus::Connected,
                    telemetry(&track, fixes, track.speed_mps * elapsed.as_secs_f64()),
                ));
            }
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairway::Distance;
    use fairway::geo::{bearing_degrees, distance_meters};

    fn section() -> MockLocationSection {
        MockLocationSection {
            name: "walk".into(),
            start_latitude: 55.0209,
            start_longitude: -7.2479,
            heading_deg: 90.0,
            walk_speed_mps: Some(2.0),
            interval_ms: None,
            jitter: Some(Distance::Feet(10.0)),
        }
    }

    #[test]
    fn track_from_section() {
        let track = WalkingTrack::from_section(&section()).unwrap();
        assert_eq!(track.interval, Duration::from_millis(DEFAULT_INTERVAL_MS));
        assert!((track.jitter_m - 3.048).abs() < 1e-9);

        let mut bad = section();
        bad.start_longitude = 200.0;
        assert!(WalkingTrack::from_section(&bad).is_err());
    }

    #[test]
    fn walks_along_heading() {
        let track = WalkingTrack::from_section(&section()).unwrap();
        let p = track.position_at(Duration::from_secs(10));
        assert!((distance_meters(&track.start, &p) - 20.0).abs() < 0.01);
        assert!((bearing_degrees(&track.start, &p) - 90.0).abs() < 0.1);
    }

    #[test]
    fn noise_stays_within_jitter() {
        let here = Coordinate::new(55.0209, -7.2479).unwrap();
        let mut seed = 42;
        for _ in 0..100 {
            let noisy = add_noise(here, 5.0, &mut seed);
            assert!(distance_meters(&here, &noisy) <= 5.0 + 1e-6);
        }
        assert_eq!(add_noise(here, 0.0, &mut seed), here);
    }
}
