// ==============================================================================
// on_foot.rs — GROUND MOVEMENT
// ------------------------------------------------------------------------------
// The server sets horizontal velocity directly while grounded instead of
// integrating impulses: responsiveness stays crisp no matter how late the
// client's intent arrived. Vertical velocity is always left to the
// integrator. Airborne players only get a token amount of steering.
// ==============================================================================

use rapier3d::prelude::vector;

use crate::config;
use crate::control::{flatten, wasd_direction};
use crate::physics::PhysicsWorld;
use crate::protocol::InputIntent;
use crate::state::Player;

/// Blend factors for the grounded velocity-set discipline.
const KEEP: f32 = 0.9;          // fraction of current horizontal velocity kept
const GAIN: f32 = 0.15;         // fraction of target speed mixed in per tick
const IDLE_DAMP: f32 = 0.8;     // horizontal damping when no key is held

/// Small downward impulse that keeps the capsule pressed onto slopes.
const STICK_IMPULSE: f32 = -0.2;

/// Airborne steering impulse per tick.
const AIR_CONTROL: f32 = 0.02;

/// Jumps are refused once vertical speed exceeds this (already rising).
const JUMP_VY_LIMIT: f32 = 0.5;

pub fn apply(phys: &mut PhysicsWorld, player: &mut Player, input: &InputIntent) {
    if let Some(look) = input.look_direction {
        let look: nalgebra::Vector3<f32> = look.into();
        let len = look.norm();
        if len > 1e-6 {
            player.look_dir = look / len;
        }
    }

    let forward = flatten(player.look_dir);
    let right = vector![-forward.z, 0.0, forward.x];
    let direction = wasd_direction(forward, right, input);

    let Some(body) = phys.body_mut(player.body) else { return };

    if player.grounded {
        let v = *body.linvel();
        if let Some(dir) = direction {
            let target = vector![
                v.x * KEEP + dir.x * config::PLAYER_SPEED * GAIN,
                v.y,
                v.z * KEEP + dir.z * config::PLAYER_SPEED * GAIN
            ];
            body.set_linvel(target, true);
        } else {
            body.set_linvel(vector![v.x * IDLE_DAMP, v.y, v.z * IDLE_DAMP], true);
        }

        body.apply_impulse(vector![0.0, STICK_IMPULSE, 0.0], true);

        if input.jump && body.linvel().y < JUMP_VY_LIMIT {
            body.apply_impulse(vector![0.0, config::JUMP_FORCE, 0.0], true);
        }
    } else if let Some(dir) = direction {
        body.apply_impulse(dir * AIR_CONTROL, true);
    }
}
