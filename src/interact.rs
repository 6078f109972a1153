// ==============================================================================
// interact.rs — INTERACTION REQUESTS + PLAYER LIFECYCLE
// ------------------------------------------------------------------------------
// Fire, board/leave vehicles, grab/drop/throw ghosts, join and disconnect.
// Every handler validates against current authoritative records and silently
// no-ops when a precondition fails: the client learns from the next snapshot,
// never from an error frame. Link fields are always written in pairs
// (vehicle.driver ⇔ player.context, ghost.carrier ⇔ player.carrying) so the
// world cannot end up half-linked.
// ==============================================================================

use rapier3d::prelude::{Vector, vector};
use tracing::{debug, info};

use crate::config;
use crate::physics::PhysicsWorld;
use crate::protocol::{ServerMessage, Vec3};
use crate::state::{ControlContext, GameState, Player, Projectile};

/// Where a player lands relative to the vehicle when they climb out.
const EXIT_OFFSET: [f32; 3] = [3.0, 1.0, 0.0];

/// Dropped ghosts start with a small downward nudge.
const DROP_VELOCITY: [f32; 3] = [0.0, -1.0, 0.0];

// ==============================================================================
// Lifecycle
// ==============================================================================

pub fn join(state: &mut GameState, phys: &mut PhysicsWorld, player_id: &str) {
    if state.players.contains_key(player_id) {
        debug!("duplicate JOIN from {player_id}");
        return;
    }
    let [sx, sy, sz] = config::SPAWN_POINT;
    let body = phys.spawn_player_body(vector![sx, sy, sz]);
    let player = Player::new(player_id.to_string(), body);
    let snapshot = state.player_snapshot(&player);
    state.players.insert(player_id.to_string(), player);
    info!("player {player_id} joined");
    state.broadcast(&ServerMessage::PlayerJoined { player: snapshot });
}

/// Full teardown on socket close: vacate any vehicle, drop any ghost, then
/// remove the body and the record together.
pub fn disconnect(state: &mut GameState, phys: &mut PhysicsWorld, player_id: &str) {
    if let Some(player) = state.players.get(player_id) {
        if matches!(player.context, ControlContext::Driving { .. }) {
            exit_vehicle(state, phys, player_id);
        }
    }
    if state.players.get(player_id).is_some_and(|p| p.carrying.is_some()) {
        drop_ghost(state, phys, player_id);
    }
    if let Some(player) = state.players.remove(player_id) {
        phys.remove_body(player.body);
        info!("player {player_id} left");
        state.broadcast(&ServerMessage::PlayerLeft { player_id: player_id.to_string() });
    }
}

// ==============================================================================
// Weapons
// ==============================================================================

pub fn fire(
    state: &mut GameState,
    phys: &mut PhysicsWorld,
    player_id: &str,
    direction: Vec3,
    origin: Vec3,
    now: f64,
) {
    {
        let Some(player) = state.players.get_mut(player_id) else { return };
        if now - player.last_fire_time < config::FIRE_RATE as f64 {
            debug!("fire from {player_id} still on cooldown");
            return;
        }
        player.last_fire_time = now;
    }

    let origin: Vector<f32> = origin.into();
    let velocity = Vector::<f32>::from(direction) * config::PROJECTILE_SPEED;
    let body = phys.spawn_projectile_body(origin, velocity);
    let id = state.new_projectile_id();
    let projectile = Projectile {
        id: id.clone(),
        owner: player_id.to_string(),
        body,
        created_at: now,
        position: origin,
        velocity,
    };
    let snapshot = state.projectile_snapshot(&projectile);
    state.projectiles.insert(id, projectile);
    state.broadcast(&ServerMessage::ProjectileSpawn { projectile: snapshot });
}

// ==============================================================================
// Vehicles
// ==============================================================================

pub fn enter_vehicle(
    state: &mut GameState,
    phys: &mut PhysicsWorld,
    player_id: &str,
    vehicle_id: &str,
) {
    let Some(player) = state.players.get_mut(player_id) else { return };
    let Some(vehicle) = state.vehicles.get_mut(vehicle_id) else {
        debug!("enter request for unknown vehicle {vehicle_id}");
        return;
    };

    if player.context != ControlContext::OnFoot
        || player.carrying.is_some()
        || vehicle.driver.is_some()
        || (player.position - vehicle.position).norm() > config::INTERACTION_RANGE
    {
        debug!("enter {vehicle_id} refused for {player_id}");
        return;
    }

    vehicle.driver = Some(player_id.to_string());
    player.context = ControlContext::Driving { vehicle: vehicle_id.to_string() };

    // Park the capsule off-world: no collisions, no visibility, no
    // integration until exit.
    let body_handle = player.body;
    phys.set_kinematic(body_handle);
    if let Some(body) = phys.body_mut(body_handle) {
        let [px, py, pz] = config::PARKED_BODY_POS;
        body.set_translation(vector![px, py, pz], true);
        body.set_linvel(vector![0.0, 0.0, 0.0], true);
    }

    broadcast_vehicle(state, vehicle_id);
}

pub fn exit_vehicle(state: &mut GameState, phys: &mut PhysicsWorld, player_id: &str) {
    let Some(player) = state.players.get_mut(player_id) else { return };
    let ControlContext::Driving { vehicle: vehicle_id } = player.context.clone() else {
        return;
    };
    let Some(vehicle) = state.vehicles.get_mut(&vehicle_id) else { return };

    let [ox, oy, oz] = EXIT_OFFSET;
    let exit_pos = vehicle.position + vector![ox, oy, oz];

    vehicle.driver = None;
    player.context = ControlContext::OnFoot;
    player.position = exit_pos;
    player.velocity = vector![0.0, 0.0, 0.0];

    let body_handle = player.body;
    phys.set_dynamic(body_handle);
    if let Some(body) = phys.body_mut(body_handle) {
        body.set_translation(exit_pos, true);
        body.set_linvel(vector![0.0, 0.0, 0.0], true);
    }

    broadcast_vehicle(state, &vehicle_id);
}

// ==============================================================================
// Ghosts
// ==============================================================================

pub fn grab_ghost(
    state: &mut GameState,
    phys: &mut PhysicsWorld,
    player_id: &str,
    ghost_id: &str,
) {
    let Some(player) = state.players.get_mut(player_id) else { return };
    let Some(ghost) = state.ghosts.get_mut(ghost_id) else {
        debug!("grab request for unknown ghost {ghost_id}");
        return;
    };

    if player.context != ControlContext::OnFoot
        || player.carrying.is_some()
        || ghost.carrier.is_some()
        || ghost.mass > config::MAX_CARRY_MASS
        || (player.position - ghost.position).norm() > config::GHOST_INTERACTION_RANGE
    {
        debug!("grab {ghost_id} refused for {player_id}");
        return;
    }

    ghost.carrier = Some(player_id.to_string());
    player.carrying = Some(ghost_id.to_string());
    phys.set_kinematic(ghost.body);

    broadcast_ghost(state, ghost_id);
}

pub fn drop_ghost(state: &mut GameState, phys: &mut PhysicsWorld, player_id: &str) {
    let [vx, vy, vz] = DROP_VELOCITY;
    release_ghost(state, phys, player_id, vector![vx, vy, vz]);
}

pub fn throw_ghost(
    state: &mut GameState,
    phys: &mut PhysicsWorld,
    player_id: &str,
    direction: Vec3,
) {
    let velocity = Vector::<f32>::from(direction) * config::THROW_FORCE;
    release_ghost(state, phys, player_id, velocity);
}

fn release_ghost(
    state: &mut GameState,
    phys: &mut PhysicsWorld,
    player_id: &str,
    velocity: Vector<f32>,
) {
    let Some(player) = state.players.get_mut(player_id) else { return };
    let Some(ghost_id) = player.carrying.take() else { return };
    let Some(ghost) = state.ghosts.get_mut(&ghost_id) else { return };

    ghost.carrier = None;
    ghost.velocity = velocity;

    phys.set_dynamic(ghost.body);
    if let Some(body) = phys.body_mut(ghost.body) {
        body.set_linvel(velocity, true);
    }

    broadcast_ghost(state, &ghost_id);
}

// ==============================================================================

fn broadcast_vehicle(state: &GameState, vehicle_id: &str) {
    if let Some(vehicle) = state.vehicles.get(vehicle_id) {
        let snapshot = state.vehicle_snapshot(vehicle);
        state.broadcast(&ServerMessage::VehicleUpdate { vehicle: snapshot });
    }
}

fn broadcast_ghost(state: &GameState, ghost_id: &str) {
    if let Some(ghost) = state.ghosts.get(ghost_id) {
        let snapshot = state.ghost_snapshot(ghost);
        state.broadcast(&ServerMessage::GhostUpdate { ghost: snapshot });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rapier3d::prelude::RigidBodyType;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use crate::level;
    use crate::state::VehicleKind;

    struct Fixture {
        state: GameState,
        phys: PhysicsWorld,
        rx: UnboundedReceiver<String>,
    }

    fn fixture() -> Fixture {
        let mut state = GameState::new();
        let mut phys = PhysicsWorld::new();
        level::build_world(&mut state, &mut phys);

        let (tx, rx) = mpsc::unbounded_channel();
        state.register_client("player".into(), tx);
        join(&mut state, &mut phys, "player");

        Fixture { state, phys, rx }
    }

    fn frames(rx: &mut UnboundedReceiver<String>) -> Vec<String> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(frame);
        }
        out
    }

    fn count_type(frames: &[String], tag: &str) -> usize {
        frames.iter().filter(|f| f.contains(tag)).count()
    }

    fn car_id(state: &GameState) -> String {
        state
            .vehicles
            .values()
            .find(|v| v.kind == VehicleKind::Car)
            .unwrap()
            .id
            .clone()
    }

    fn light_ghost_id(state: &GameState) -> String {
        state
            .ghosts
            .values()
            .find(|g| g.mass <= config::MAX_CARRY_MASS)
            .unwrap()
            .id
            .clone()
    }

    #[test]
    fn join_creates_record_and_announces() {
        let mut f = fixture();
        assert!(f.state.players.contains_key("player"));
        assert!(f.phys.body(f.state.players["player"].body).is_some());
        let frames = frames(&mut f.rx);
        assert_eq!(count_type(&frames, "PLAYER_JOINED"), 1);
    }

    #[test]
    fn fire_respects_the_cooldown() {
        let mut f = fixture();
        let dir = Vec3::new(0.0, 0.0, -1.0);
        let origin = Vec3::new(0.0, 5.0, 0.0);

        fire(&mut f.state, &mut f.phys, "player", dir, origin, 1.0);
        fire(&mut f.state, &mut f.phys, "player", dir, origin, 1.001);
        assert_eq!(f.state.projectiles.len(), 1);

        // Exactly one cooldown later is allowed, a hair earlier is not.
        fire(&mut f.state, &mut f.phys, "player", dir, origin, 1.0 + config::FIRE_RATE as f64);
        assert_eq!(f.state.projectiles.len(), 2);
        fire(
            &mut f.state,
            &mut f.phys,
            "player",
            dir,
            origin,
            1.0 + 1.9 * config::FIRE_RATE as f64,
        );
        assert_eq!(f.state.projectiles.len(), 2);

        let frames = frames(&mut f.rx);
        assert_eq!(count_type(&frames, "PROJECTILE_SPAWN"), 2);
    }

    #[test]
    fn projectile_leaves_with_muzzle_velocity() {
        let mut f = fixture();
        fire(
            &mut f.state,
            &mut f.phys,
            "player",
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 5.0, 0.0),
            0.0,
        );
        let projectile = f.state.projectiles.values().next().unwrap();
        let v = *f.phys.body(projectile.body).unwrap().linvel();
        assert_relative_eq!(v.x, config::PROJECTILE_SPEED, epsilon = 1e-4);
    }

    #[test]
    fn enter_vehicle_links_and_parks_the_body() {
        let mut f = fixture();
        let car = car_id(&f.state);
        let car_pos = f.state.vehicles[&car].position;
        f.state.players.get_mut("player").unwrap().position = car_pos + vector![1.0, 0.0, 0.0];

        enter_vehicle(&mut f.state, &mut f.phys, "player", &car);

        assert_eq!(f.state.vehicles[&car].driver.as_deref(), Some("player"));
        assert_eq!(
            f.state.players["player"].context,
            ControlContext::Driving { vehicle: car.clone() }
        );
        let body = f.phys.body(f.state.players["player"].body).unwrap();
        assert_eq!(body.body_type(), RigidBodyType::KinematicPositionBased);
        assert!(body.translation().y < -100.0);

        let frames = frames(&mut f.rx);
        assert_eq!(count_type(&frames, "VEHICLE_UPDATE"), 1);
    }

    #[test]
    fn enter_vehicle_range_boundary() {
        let mut f = fixture();
        let car = car_id(&f.state);
        let car_pos = f.state.vehicles[&car].position;

        // Just past the range: refused.
        f.state.players.get_mut("player").unwrap().position =
            car_pos + vector![config::INTERACTION_RANGE + 0.01, 0.0, 0.0];
        enter_vehicle(&mut f.state, &mut f.phys, "player", &car);
        assert!(f.state.vehicles[&car].driver.is_none());

        // Exactly at the range: allowed.
        f.state.players.get_mut("player").unwrap().position =
            car_pos + vector![config::INTERACTION_RANGE, 0.0, 0.0];
        enter_vehicle(&mut f.state, &mut f.phys, "player", &car);
        assert!(f.state.vehicles[&car].driver.is_some());
    }

    #[test]
    fn occupied_vehicle_refuses_a_second_driver() {
        let mut f = fixture();
        let car = car_id(&f.state);
        let car_pos = f.state.vehicles[&car].position;

        join(&mut f.state, &mut f.phys, "second");
        for id in ["player", "second"] {
            f.state.players.get_mut(id).unwrap().position = car_pos;
        }

        enter_vehicle(&mut f.state, &mut f.phys, "player", &car);
        enter_vehicle(&mut f.state, &mut f.phys, "second", &car);

        assert_eq!(f.state.vehicles[&car].driver.as_deref(), Some("player"));
        assert_eq!(f.state.players["second"].context, ControlContext::OnFoot);
    }

    #[test]
    fn exit_vehicle_restores_the_player() {
        let mut f = fixture();
        let car = car_id(&f.state);
        let car_pos = f.state.vehicles[&car].position;
        f.state.players.get_mut("player").unwrap().position = car_pos;
        enter_vehicle(&mut f.state, &mut f.phys, "player", &car);

        exit_vehicle(&mut f.state, &mut f.phys, "player");

        let player = &f.state.players["player"];
        assert_eq!(player.context, ControlContext::OnFoot);
        assert!(f.state.vehicles[&car].driver.is_none());

        let body = f.phys.body(player.body).unwrap();
        assert_eq!(body.body_type(), RigidBodyType::Dynamic);
        let expected = car_pos + vector![3.0, 1.0, 0.0];
        assert_relative_eq!(body.translation().x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(body.translation().y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(body.linvel().norm(), 0.0);
    }

    #[test]
    fn grab_checks_range_mass_and_hands() {
        let mut f = fixture();
        let ghost = light_ghost_id(&f.state);
        let ghost_pos = f.state.ghosts[&ghost].position;

        // Too far away.
        f.state.players.get_mut("player").unwrap().position =
            ghost_pos + vector![config::GHOST_INTERACTION_RANGE + 1.0, 0.0, 0.0];
        grab_ghost(&mut f.state, &mut f.phys, "player", &ghost);
        assert!(f.state.ghosts[&ghost].carrier.is_none());

        // In range: grabbed and switched kinematic.
        f.state.players.get_mut("player").unwrap().position = ghost_pos;
        grab_ghost(&mut f.state, &mut f.phys, "player", &ghost);
        assert_eq!(f.state.ghosts[&ghost].carrier.as_deref(), Some("player"));
        assert_eq!(f.state.players["player"].carrying.as_deref(), Some(ghost.as_str()));
        assert_eq!(
            f.phys.body(f.state.ghosts[&ghost].body).unwrap().body_type(),
            RigidBodyType::KinematicPositionBased
        );

        // Hands full: a second grab is refused.
        let other = f
            .state
            .ghosts
            .values()
            .find(|g| g.id != ghost && g.mass <= config::MAX_CARRY_MASS)
            .unwrap()
            .id
            .clone();
        let other_pos = f.state.ghosts[&other].position;
        f.state.players.get_mut("player").unwrap().position = other_pos;
        grab_ghost(&mut f.state, &mut f.phys, "player", &other);
        assert!(f.state.ghosts[&other].carrier.is_none());
    }

    #[test]
    fn heavy_ghost_cannot_be_carried() {
        let mut f = fixture();
        let heavy = f
            .state
            .ghosts
            .values()
            .find(|g| g.mass > config::MAX_CARRY_MASS)
            .unwrap()
            .id
            .clone();
        let pos = f.state.ghosts[&heavy].position;
        f.state.players.get_mut("player").unwrap().position = pos;

        grab_ghost(&mut f.state, &mut f.phys, "player", &heavy);
        assert!(f.state.ghosts[&heavy].carrier.is_none());
    }

    #[test]
    fn enter_vehicle_refused_while_carrying() {
        let mut f = fixture();
        let ghost = light_ghost_id(&f.state);
        let ghost_pos = f.state.ghosts[&ghost].position;
        f.state.players.get_mut("player").unwrap().position = ghost_pos;
        grab_ghost(&mut f.state, &mut f.phys, "player", &ghost);

        let car = car_id(&f.state);
        let car_pos = f.state.vehicles[&car].position;
        f.state.players.get_mut("player").unwrap().position = car_pos;
        enter_vehicle(&mut f.state, &mut f.phys, "player", &car);

        assert!(f.state.vehicles[&car].driver.is_none());
        assert_eq!(f.state.players["player"].context, ControlContext::OnFoot);
    }

    #[test]
    fn throw_releases_with_direction_times_force() {
        let mut f = fixture();
        let ghost = light_ghost_id(&f.state);
        let ghost_pos = f.state.ghosts[&ghost].position;
        f.state.players.get_mut("player").unwrap().position = ghost_pos;
        grab_ghost(&mut f.state, &mut f.phys, "player", &ghost);

        throw_ghost(&mut f.state, &mut f.phys, "player", Vec3::new(1.0, 0.0, 0.0));

        let record = &f.state.ghosts[&ghost];
        assert!(record.carrier.is_none());
        assert!(f.state.players["player"].carrying.is_none());
        let body = f.phys.body(record.body).unwrap();
        assert_eq!(body.body_type(), RigidBodyType::Dynamic);
        assert_relative_eq!(body.linvel().x, config::THROW_FORCE, epsilon = 1e-4);
        assert_relative_eq!(body.linvel().y, 0.0, epsilon = 1e-4);
    }

    #[test]
    fn drop_releases_with_a_downward_nudge() {
        let mut f = fixture();
        let ghost = light_ghost_id(&f.state);
        let ghost_pos = f.state.ghosts[&ghost].position;
        f.state.players.get_mut("player").unwrap().position = ghost_pos;
        grab_ghost(&mut f.state, &mut f.phys, "player", &ghost);

        drop_ghost(&mut f.state, &mut f.phys, "player");

        let record = &f.state.ghosts[&ghost];
        assert!(record.carrier.is_none());
        assert_relative_eq!(f.phys.body(record.body).unwrap().linvel().y, -1.0, epsilon = 1e-4);
    }

    #[test]
    fn disconnect_vacates_everything() {
        let mut f = fixture();
        let car = car_id(&f.state);
        let car_pos = f.state.vehicles[&car].position;
        f.state.players.get_mut("player").unwrap().position = car_pos;
        enter_vehicle(&mut f.state, &mut f.phys, "player", &car);

        let body = f.state.players["player"].body;
        disconnect(&mut f.state, &mut f.phys, "player");

        assert!(f.state.players.is_empty());
        assert!(f.phys.body(body).is_none());
        assert!(f.state.vehicles[&car].driver.is_none());

        let frames = frames(&mut f.rx);
        assert_eq!(count_type(&frames, "PLAYER_LEFT"), 1);
        // Vacating the vehicle was announced before the player left.
        assert_eq!(count_type(&frames, "VEHICLE_UPDATE"), 2);
    }
}
