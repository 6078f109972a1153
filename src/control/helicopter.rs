// ==============================================================================
// helicopter.rs — ROTOR VEHICLE
// ------------------------------------------------------------------------------
// Collective on jump/descend, hover trim while the engine runs, planar thrust
// on forward/back with a matching pitch tilt, yaw on left/right. The first
// climb input starts the engine; it never stops until the driver leaves.
// Above the altitude ceiling every upward impulse is clamped to zero, so the
// ceiling is soft: gravity brings the aircraft back down.
// ==============================================================================

use rapier3d::prelude::vector;

use crate::config;
use crate::control::{planar_forward, right3};
use crate::physics::PhysicsWorld;
use crate::protocol::InputIntent;
use crate::state::Vehicle;

/// Descent runs the collective at half strength.
const DESCEND_FACTOR: f32 = 0.5;

/// Reverse thrust is half of forward.
const REVERSE_FACTOR: f32 = 0.5;

pub fn apply(phys: &mut PhysicsWorld, vehicle: &mut Vehicle, input: &InputIntent) {
    let tuning = &config::HELICOPTER;
    let Some(body) = phys.body_mut(vehicle.body) else { return };

    let rot = *body.rotation();
    let forward = planar_forward(&rot);
    let right = right3(&rot);
    let above_ceiling = body.translation().y > tuning.max_altitude;

    // Collective.
    if input.jump {
        vehicle.engine_on = true;
        if !above_ceiling {
            body.apply_impulse(vector![0.0, tuning.lift, 0.0], true);
        }
    } else if input.descend {
        body.apply_impulse(vector![0.0, -tuning.lift * DESCEND_FACTOR, 0.0], true);
    } else if vehicle.engine_on && !above_ceiling {
        body.apply_impulse(vector![0.0, tuning.hover_trim, 0.0], true);
    }

    // Cyclic: planar thrust plus a pitch tilt in the same sense.
    if input.move_forward {
        body.apply_impulse(forward * tuning.thrust, true);
        body.apply_torque_impulse(-right * tuning.tilt_angle, true);
    }
    if input.move_backward {
        body.apply_impulse(-forward * tuning.thrust * REVERSE_FACTOR, true);
        body.apply_torque_impulse(right * tuning.tilt_angle, true);
    }

    // Tail rotor.
    if input.move_left {
        body.apply_torque_impulse(vector![0.0, tuning.turn_speed, 0.0], true);
    }
    if input.move_right {
        body.apply_torque_impulse(vector![0.0, -tuning.turn_speed, 0.0], true);
    }
}
