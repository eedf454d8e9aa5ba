//! Axum web server: REST endpoints and WebSocket event streaming.

pub mod routes;
pub mod types;
pub mod ws;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::routing::{delete, get, post, put};
use tokio::sync::{RwLock, broadcast};
use tower_http::cors::CorsLayer;

use crate::actors::{Actor, ReconfigureOutcome, actor_names};
use crate::bus::{BusReceiver, BusSender};
use crate::state::SystemState;
use fairway::{ActorState, ActorStatus, ActorStatusResponse, FairwayEvent, FairwayMessage};

fn new_actor(name: String) -> ActorStatusResponse {
    ActorStatusResponse {
        name,
        status: ActorStatus::Disconnected,
        telemetry: HashMap::new(),
    }
}

/// Shared state for the web layer.
pub struct WebState {
    pub root: Arc<SystemState>,
    pub bus_tx: broadcast::Sender<FairwayMessage>,
    /// Latest status per actor id, fed from `ActorStatus` events.
    pub actors: RwLock<HashMap<String, ActorStatusResponse>>,
    pub addr: SocketAddr,
    pub actor_id: String,
    pub ws_count: AtomicU64,
    pub request_count: AtomicU64,
}

fn emit_status(status: ActorStatus, state: &WebState) {
    let mut telemetry = HashMap::from([
        ("bind".into(), state.addr.to_string()),
        (
            "websockets".into(),
            state.ws_count.load(Ordering::Relaxed).to_string(),
        ),
        (
            "requests".into(),
            state.request_count.load(Ordering::Relaxed).to_string(),
        ),
    ]);
    if status == ActorStatus::Disconnected {
        telemetry.insert("error".into(), "bind failed".into());
    }
    let _ = state
        .bus_tx
        .send(FairwayMessage::new(ActorState::new(status, telemetry)).source(&state.actor_id));
}

pub(super) fn emit_telemetry(state: &WebState) {
    emit_status(ActorStatus::Connected, state);
}

// ---------------------------------------------------------------------------
// WebActor
// ---------------------------------------------------------------------------

/// Runs the axum server on a dedicated thread with its own tokio runtime.
pub struct WebActor {
    addr: SocketAddr,
    shutdown_tx: Mutex<Option<tokio::sync::oneshot::Sender<()>>>,
}

impl WebActor {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            shutdown_tx: Mutex::new(None),
        }
    }
}

impl Actor for WebActor {
    fn start(&self, state: Arc<SystemState>, sender: BusSender, _receiver: BusReceiver) {
        let addr = self.addr;
        let actor_id = sender.actor_id().to_string();
        let bus_tx = sender.raw_sender().clone();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        *self.shutdown_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(shutdown_tx);

        std::thread::Builder::new()
            .name(actor_id.clone())
            .spawn(move || match tokio::runtime::Runtime::new() {
                Ok(rt) => rt.block_on(run(addr, actor_id, state, bus_tx, shutdown_rx)),
                Err(e) => tracing::error!("web server '{actor_id}': no runtime: {e}"),
            })
            .expect("failed to spawn webserver thread");
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
        let index = sender.actor_id().strip_prefix("webserver.").unwrap_or("0");
        let new_bind = snap.webserver.get(index).map(|w| w.bind.as_str());
        match new_bind.and_then(|b| b.parse::<SocketAddr>().ok()) {
            Some(new_addr) if new_addr == self.addr => ReconfigureOutcome::NoChange,
            _ => ReconfigureOutcome::RestartRequired,
        }
    }
}

pub fn router(state: Arc<WebState>) -> Router {
    let counter_state = Arc::clone(&state);
    let count_middleware = axum::middleware::from_fn(move |req, next: axum::middleware::Next| {
        let st = Arc::clone(&counter_state);
        async move {
            st.request_count.fetch_add(1, Ordering::Relaxed);
            next.run(req).await
        }
    });

    Router::new()
        .route("/api/status", get(routes::get_status))
        .route(
            "/api/placement",
            get(routes::get_placement).post(routes::post_placement),
        )
        .route("/api/placement/activate", post(routes::post_activate))
        .route("/api/placement/cancel", post(routes::post_cancel))
        .route("/api/skill", post(routes::post_skill))
        .route("/api/location", post(routes::post_location))
        .route("/api/proximity", get(routes::get_proximity))
        .route(
            "/api/settings",
            get(routes::get_settings).post(routes::post_settings),
        )
        .route("/api/settings/{id}", delete(routes::delete_section))
        .route(
            "/api/course/{id}",
            put(routes::put_course).delete(routes::delete_course),
        )
        .route("/api/ws", get(ws::ws_upgrade))
        .layer(count_middleware)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Blocks until the shutdown signal or bus close.
async fn run(
    addr: SocketAddr,
    actor_id: String,
    root: Arc<SystemState>,
    bus_tx: broadcast::Sender<FairwayMessage>,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) {
    let names = actor_names(&root.system.snapshot());
    let actors = names
        .into_iter()
        .map(|(id, name)| (id, new_actor(name)))
        .collect();

    let state = Arc::new(WebState {
        root,
        bus_tx: bus_tx.clone(),
        actors: RwLock::new(actors),
        addr,
        actor_id,
        ws_count: AtomicU64::new(0),
        request_count: AtomicU64::new(0),
    });

    tokio::spawn(state_updater(Arc::clone(&state), bus_tx.subscribe()));

    let telemetry_state = Arc::clone(&state);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(5));
        loop {
            interval.tick().await;
            emit_telemetry(&telemetry_state);
        }
    });

    let app = router(Arc::clone(&state));

    let listener = loop {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(l) => break l,
            Err(e) => {
                tracing::warn!("web server: failed to bind {addr}: {e}, retrying in 3s");
                emit_status(ActorStatus::Disconnected, &state);
                tokio::select! {
                    _ = tokio::time::sleep(std::time::Duration::from_secs(3)) => continue,
                    _ = &mut shutdown_rx => return,
                }
            }
        }
    };

    tracing::info!("web server listening on {addr}");
    emit_status(ActorStatus::Connected, &state);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async { drop(shutdown_rx.await) })
        .await
    {
        tracing::warn!("web server on {addr} stopped: {e}");
    }
}

async fn state_updater(state: Arc<WebState>, mut bus_rx: broadcast::Receiver<FairwayMessage>) {
    loop {
        match bus_rx.recv().await {
            Ok(msg) => apply_bus_event(&state, &msg).await,
            Err(broadcast::error::RecvError::Closed) => break,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                tracing::warn!("web state updater: lagged, dropped {n} events");
            }
        }
    }
}

async fn apply_bus_event(state: &WebState, msg: &FairwayMessage) {
    match &msg.event {
        FairwayEvent::ActorStatus(update) => {
            let mut actors = state.actors.write().await;
            let actor = actors
                .entry(msg.source.clone())
                .or_insert_with(|| new_actor(String::new()));
            actor.status = update.status;
            actor.telemetry = update.telemetry.clone();
        }
        FairwayEvent::ConfigOutcome(result)
            if !result.started.is_empty()
                || !result.stopped.is_empty()
                || !result.restarted.is_empty() =>
        {
            let names = actor_names(&state.root.system.snapshot());
            let mut actors = state.actors.write().await;
            for (id, name) in names {
                actors
                    .entry(id)
                    .or_insert_with(|| new_actor(String::new()))
                    .name = name;
            }
            for id in &result.stopped {
                actors.remove(id);
            }
        }
        FairwayEvent::Alert(alert) => {
            tracing::debug!("web: alert from {}: {}", msg.source, alert.message);
        }
        _ => {}
    }
}
