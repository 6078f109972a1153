// ==============================================================================
// tick.rs — FIXED-RATE SIMULATION PIPELINE
// ------------------------------------------------------------------------------
// One call per tick, phases in a fixed order:
// 1) resolve stored inputs into forces/velocities (control::*)
// 2) step the physics world exactly once
// 3) mirror player records from their bodies (drivers excluded: their body is
//    parked off-world and meaningless until exit)
// 4) ground detection, after the step so next tick's input resolution sees
//    fresh contact state
// 5) carry-follow, after the step so held ghosts snap to post-step carriers
// 6) mirror vehicle and ghost records (carried ghosts keep the position the
//    follow phase just wrote)
// 7) projectile maintenance against the already-synced player positions
// 8) snapshot, serialized once, fanned out to every client
// ==============================================================================

use rapier3d::prelude::vector;
use tracing::warn;

use crate::config;
use crate::control;
use crate::physics::PhysicsWorld;
use crate::protocol::ServerMessage;
use crate::state::{ControlContext, GameState};

/// Held ghosts float this far above the carry point.
const CARRY_RAISE: f32 = 0.5;

pub fn run(state: &mut GameState, phys: &mut PhysicsWorld, now: f64) {
    control::resolve(phys, &mut state.players, &mut state.vehicles);

    phys.step(config::TICK_DT);

    sync_players(state, phys);
    detect_ground(state, phys);
    carry_follow(state, phys);
    sync_vehicles(state, phys);
    sync_ghosts(state, phys);
    update_projectiles(state, phys, now);

    state.tick += 1;
    let snapshot = state.world_snapshot();
    state.broadcast(&ServerMessage::GameState { state: snapshot });
}

fn sync_players(state: &mut GameState, phys: &mut PhysicsWorld) {
    let mut dangling = Vec::new();
    for player in state.players.values_mut() {
        if matches!(player.context, ControlContext::Driving { .. }) {
            continue;
        }
        let Some(body) = phys.body(player.body) else {
            dangling.push(player.id.clone());
            continue;
        };
        player.position = *body.translation();
        player.rotation = *body.rotation();
        player.velocity = *body.linvel();
    }

    // A record without a body is unrecoverable: drop the entity, keep serving.
    for id in dangling {
        warn!("player {id} lost its body, dropping the record");
        state.players.remove(&id);
        state.broadcast(&ServerMessage::PlayerLeft { player_id: id });
    }
}

fn detect_ground(state: &mut GameState, phys: &mut PhysicsWorld) {
    phys.refresh_queries();
    let grounded_within = config::PLAYER_HEIGHT / 2.0 + config::GROUND_EPSILON;

    for player in state.players.values_mut() {
        if matches!(player.context, ControlContext::Driving { .. }) {
            continue;
        }
        match phys.ground_scan(player.body) {
            Some(contact) => {
                player.grounded = contact.distance <= grounded_within;
                player.ground_distance = contact.distance;
                player.ground_normal = contact.normal;
            }
            None => {
                player.grounded = false;
                player.ground_distance = f32::INFINITY;
                player.ground_normal = vector![0.0, 1.0, 0.0];
            }
        }
    }
}

fn carry_follow(state: &mut GameState, phys: &mut PhysicsWorld) {
    for player in state.players.values() {
        let Some(ghost_id) = &player.carrying else { continue };
        let Some(ghost) = state.ghosts.get_mut(ghost_id) else { continue };

        let target = player.position
            + player.look_dir * config::CARRY_DISTANCE
            + vector![0.0, CARRY_RAISE, 0.0];

        if let Some(body) = phys.body_mut(ghost.body) {
            body.set_next_kinematic_translation(target);
        }
        ghost.position = target;
        ghost.velocity = player.velocity;
    }
}

fn sync_vehicles(state: &mut GameState, phys: &PhysicsWorld) {
    for vehicle in state.vehicles.values_mut() {
        let Some(body) = phys.body(vehicle.body) else {
            warn!("vehicle {} lost its body", vehicle.id);
            continue;
        };
        vehicle.position = *body.translation();
        vehicle.rotation = *body.rotation();
        vehicle.velocity = *body.linvel();
    }
}

fn sync_ghosts(state: &mut GameState, phys: &PhysicsWorld) {
    for ghost in state.ghosts.values_mut() {
        if ghost.carrier.is_some() {
            continue;
        }
        let Some(body) = phys.body(ghost.body) else {
            warn!("ghost {} lost its body", ghost.id);
            continue;
        };
        ghost.position = *body.translation();
        ghost.rotation = *body.rotation();
        ghost.velocity = *body.linvel();
    }
}

fn update_projectiles(state: &mut GameState, phys: &mut PhysicsWorld, now: f64) {
    let mut expired = Vec::new();
    let mut hits = Vec::new();
    let hit_radius = config::PLAYER_RADIUS + config::PROJECTILE_RADIUS;

    for projectile in state.projectiles.values_mut() {
        let Some(body) = phys.body(projectile.body) else {
            expired.push(projectile.id.clone());
            continue;
        };
        projectile.position = *body.translation();
        projectile.velocity = *body.linvel();

        if now - projectile.created_at > config::PROJECTILE_TTL as f64 {
            expired.push(projectile.id.clone());
            continue;
        }
        if projectile.position.norm() > config::WORLD_BOUND {
            expired.push(projectile.id.clone());
            continue;
        }

        for player in state.players.values_mut() {
            if player.id == projectile.owner {
                continue;
            }
            if matches!(player.context, ControlContext::Driving { .. }) {
                continue;
            }
            if (player.position - projectile.position).norm() >= hit_radius {
                continue;
            }

            player.health = (player.health - config::PROJECTILE_DAMAGE).max(0);
            hits.push((player.id.clone(), player.health));
            expired.push(projectile.id.clone());

            if player.health <= 0 {
                // Respawn in the same tick: full health, spawn point, at rest.
                let [sx, sy, sz] = config::SPAWN_POINT;
                player.health = config::MAX_HEALTH;
                player.position = vector![sx, sy, sz];
                player.velocity = vector![0.0, 0.0, 0.0];
                if let Some(body) = phys.body_mut(player.body) {
                    body.set_translation(vector![sx, sy, sz], true);
                    body.set_linvel(vector![0.0, 0.0, 0.0], true);
                }
            }
            break; // first hit consumes the projectile
        }
    }

    for (target, health) in hits {
        state.broadcast(&ServerMessage::Hit {
            target,
            damage: config::PROJECTILE_DAMAGE,
            health,
        });
    }
    for id in expired {
        if let Some(projectile) = state.projectiles.remove(&id) {
            phys.remove_body(projectile.body);
            state.broadcast(&ServerMessage::ProjectileRemove { projectile_id: id });
        }
    }
}
