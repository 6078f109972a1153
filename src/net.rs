// ==============================================================================
// net.rs — WEBSOCKET SESSIONS
// ------------------------------------------------------------------------------
// One task per connection for reads, one for writes. A connection gets its
// player id and INIT immediately; the player entity itself only exists after
// an explicit JOIN. Handlers run under the same two locks as the tick loop
// (physics first, then game state), so a request is applied atomically
// between ticks.
// ==============================================================================

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::Message;

use crate::config;
use crate::interact;
use crate::physics::PhysicsWorld;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::GameState;

pub async fn start_websocket_server(
    state: Arc<Mutex<GameState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
) {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(config::DEFAULT_PORT);
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .expect("failed to bind websocket listener");
    info!("🌐 WebSocket listening on ws://0.0.0.0:{port}");

    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(handle_connection(
            stream,
            Arc::clone(&state),
            Arc::clone(&physics),
        ));
    }
}

async fn handle_connection(
    stream: TcpStream,
    state: Arc<Mutex<GameState>>,
    physics: Arc<Mutex<PhysicsWorld>>,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            warn!("websocket handshake failed: {err}");
            return;
        }
    };

    // Outgoing channel for this client.
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let player_id = {
        let mut game = state.lock().await;
        let id = game.new_player_id();
        game.register_client(id.clone(), tx);
        game.send_to(
            &id,
            &ServerMessage::Init {
                player_id: id.clone(),
                level: game.level_snapshot(),
            },
        );
        id
    };
    info!("client connected: {player_id}");

    let (mut write, mut read) = ws_stream.split();

    // WRITE LOOP: snapshots and events to this client.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // READ LOOP: parse and dispatch until the socket goes away.
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let mut phys = physics.lock().await;
                let mut game = state.lock().await;
                dispatch(&text, &player_id, &mut game, &mut phys);
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // ping/pong/binary: nothing to do
            Err(err) => {
                debug!("read error from {player_id}: {err}");
                break;
            }
        }
    }

    // Disconnect path: release whatever the player held, then the session.
    {
        let mut phys = physics.lock().await;
        let mut game = state.lock().await;
        interact::disconnect(&mut game, &mut phys, &player_id);
        game.remove_client(&player_id);
    }
    writer.abort();
    info!("client disconnected: {player_id}");
}

/// Parse one inbound frame and route it. Bad JSON and unknown types are
/// logged and dropped; the session lives on.
fn dispatch(text: &str, player_id: &str, state: &mut GameState, phys: &mut PhysicsWorld) {
    let msg = match serde_json::from_str::<ClientMessage>(text) {
        Ok(msg) => msg,
        Err(err) => {
            warn!("ignoring bad frame from {player_id}: {err}");
            return;
        }
    };

    let now = state.now();
    match msg {
        ClientMessage::Join => interact::join(state, phys, player_id),
        ClientMessage::Input { input } => {
            if let Some(player) = state.players.get_mut(player_id) {
                player.last_input = Some(input);
            }
        }
        ClientMessage::Fire { direction, origin } => {
            interact::fire(state, phys, player_id, direction, origin, now)
        }
        ClientMessage::EnterVehicle { vehicle_id } => {
            interact::enter_vehicle(state, phys, player_id, &vehicle_id)
        }
        ClientMessage::ExitVehicle => interact::exit_vehicle(state, phys, player_id),
        ClientMessage::GrabGhost { ghost_id } => {
            interact::grab_ghost(state, phys, player_id, &ghost_id)
        }
        ClientMessage::DropGhost => interact::drop_ghost(state, phys, player_id),
        ClientMessage::ThrowGhost { direction } => {
            interact::throw_ghost(state, phys, player_id, direction)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level;

    fn world() -> (GameState, PhysicsWorld) {
        let mut state = GameState::new();
        let mut phys = PhysicsWorld::new();
        level::build_world(&mut state, &mut phys);
        (state, phys)
    }

    #[test]
    fn join_frame_creates_the_player() {
        let (mut state, mut phys) = world();
        dispatch(r#"{"type":"JOIN"}"#, "abc123", &mut state, &mut phys);
        assert!(state.players.contains_key("abc123"));
    }

    #[test]
    fn input_frame_stores_latest_intent() {
        let (mut state, mut phys) = world();
        dispatch(r#"{"type":"JOIN"}"#, "abc123", &mut state, &mut phys);

        dispatch(
            r#"{"type":"INPUT","input":{"moveForward":true}}"#,
            "abc123",
            &mut state,
            &mut phys,
        );
        assert!(state.players["abc123"].last_input.unwrap().move_forward);

        // The next frame replaces, never merges.
        dispatch(
            r#"{"type":"INPUT","input":{"jump":true}}"#,
            "abc123",
            &mut state,
            &mut phys,
        );
        let input = state.players["abc123"].last_input.unwrap();
        assert!(input.jump);
        assert!(!input.move_forward);
    }

    #[test]
    fn input_before_join_is_ignored() {
        let (mut state, mut phys) = world();
        dispatch(
            r#"{"type":"INPUT","input":{"jump":true}}"#,
            "ghost1",
            &mut state,
            &mut phys,
        );
        assert!(state.players.is_empty());
    }

    #[test]
    fn malformed_frames_do_not_kill_the_session() {
        let (mut state, mut phys) = world();
        dispatch("not json at all", "abc123", &mut state, &mut phys);
        dispatch(r#"{"type":"WARP_SPEED"}"#, "abc123", &mut state, &mut phys);
        dispatch(r#"{"type":"FIRE"}"#, "abc123", &mut state, &mut phys); // missing payload
        assert!(state.players.is_empty());
        assert!(state.projectiles.is_empty());
    }

    #[test]
    fn stale_entity_ids_are_a_noop() {
        let (mut state, mut phys) = world();
        dispatch(r#"{"type":"JOIN"}"#, "abc123", &mut state, &mut phys);
        dispatch(
            r#"{"type":"ENTER_VEHICLE","vehicleId":"vehicle_99"}"#,
            "abc123",
            &mut state,
            &mut phys,
        );
        dispatch(
            r#"{"type":"GRAB_GHOST","ghostId":"ghost_99"}"#,
            "abc123",
            &mut state,
            &mut phys,
        );
        let player = &state.players["abc123"];
        assert_eq!(player.context, crate::state::ControlContext::OnFoot);
        assert!(player.carrying.is_none());
    }
}
