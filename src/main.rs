// main.rs — authoritative game server
mod config;   // every tuning constant
mod control;  // per-context input resolution
mod interact; // fire / vehicles / ghosts / lifecycle
mod level;    // world init
mod net;      // websocket sessions
mod physics;  // rapier world and body recipes
mod protocol; // wire messages
mod state;    // entity records + broadcast
mod tick;     // fixed-rate pipeline

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::net::start_websocket_server;
use crate::physics::PhysicsWorld;
use crate::state::GameState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("🚀 starting game server");

    // -------------------------------------------------
    // 1) Build the world once: physics, then the roster.
    // -------------------------------------------------
    let mut phys = PhysicsWorld::new();
    let mut game = GameState::new();
    level::build_world(&mut game, &mut phys);

    let state = Arc::new(Mutex::new(game));
    let physics = Arc::new(Mutex::new(phys));

    // -------------------------------------------------
    // 2) Launch WebSocket server (network task)
    // -------------------------------------------------
    tokio::spawn(start_websocket_server(
        Arc::clone(&state),
        Arc::clone(&physics),
    ));

    // -------------------------------------------------
    // 3) Fixed timestep simulation loop
    // -------------------------------------------------
    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs_f32(config::TICK_DT));

    loop {
        interval.tick().await;

        // Lock order everywhere: physics first, then game state.
        let mut phys = physics.lock().await;
        let mut game = state.lock().await;

        let now = game.now();
        tick::run(&mut game, &mut phys, now);
    }
}
