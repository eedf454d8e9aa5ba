use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::Context;
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

mod actors;
mod bus;
mod state;

use actors::{Actor, SYSTEM_ID};
use bus::BusSender;
use fairway::UnitSystem;
use state::SystemState;

#[derive(Parser, Debug, Clone)]
#[command(name = "fairway", about = "Shot placement and course proximity runtime")]
struct Config {
    /// Config file path (default: ~/.config/fairway/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Skip the webserver sections (no REST/WS surface)
    #[arg(long)]
    no_web: bool,

    /// Override the display units saved in the config file
    #[arg(long, value_enum)]
    units: Option<UnitSystem>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new("fairway=info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::debug!("debug logging enabled");

    let cli = Config::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(state::config::default_config_path);

    let rt = tokio::runtime::Runtime::new()?;
    let _guard = rt.enter();

    let bus_tx = bus::channel();

    let (system_state, round_writer) = SystemState::new(config_path, !cli.no_web);
    let state = Arc::new(system_state);

    // Persisted, so the file reflects the running state.
    if let Some(units) = cli.units {
        state.system.update(|c| c.default_units = units);
    }

    // The system actor owns the round-state writer and must be polling
    // before anything else publishes.
    {
        let shutdown = Arc::new(AtomicBool::new(false));
        let sender = BusSender::new(SYSTEM_ID.into(), bus_tx.clone(), Arc::clone(&shutdown));
        let receiver = sender.subscribe();
        let (actor, ready_rx) = actors::system::SystemActor::new(round_writer, bus_tx.clone());
        actor.start(Arc::clone(&state), sender, receiver);
        ready_rx
            .recv()
            .context("system actor exited before signalling ready")?;
        state.register_actor(SYSTEM_ID.into(), Box::new(actor), shutdown);
    }

    let snap = state.system.snapshot();
    for ra in actors::resolve_actors(&snap, state.web_enabled) {
        tracing::info!("starting actor '{}' ({})", ra.id, ra.name);
        actors::start_actor(ra.id, ra.actor, &state, &bus_tx);
    }

    // Keeps the broadcast channel healthy when no other subscriber is reading.
    let mut drain_rx = bus_tx.subscribe();
    let drain_handle = tokio::spawn(async move {
        loop {
            match drain_rx.recv().await {
                Ok(_) => {}
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("drain subscriber lagged, dropped {n} events");
                }
            }
        }
    });

    if cli.no_web {
        tracing::info!("running without web server");
    }
    rt.block_on(async { tokio::signal::ctrl_c().await })?;

    tracing::info!("shutting down...");
    for id in state.actor_ids() {
        state.stop_actor(&id);
    }
    drop(bus_tx);
    drain_handle.abort();

    Ok(())
}
