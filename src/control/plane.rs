// ==============================================================================
// plane.rs — FIXED-WING VEHICLE
// ------------------------------------------------------------------------------
// Throttle is a scalar the driver ratchets up and down; thrust follows the
// full 3D nose direction, so a climbing plane climbs. Lift is speed-gated and
// capped: below stall speed the aircraft is just a fast brick. Left/right is
// a banked turn: roll torque with yaw coupled at half magnitude in the same
// sense, which reads like flight without a real aero model.
// ==============================================================================

use rapier3d::prelude::vector;

use crate::config;
use crate::control::{forward3, right3, up3};
use crate::physics::PhysicsWorld;
use crate::protocol::InputIntent;
use crate::state::Vehicle;

/// Yaw couples to roll at this fraction of the roll torque.
const YAW_COUPLING: f32 = 0.5;

pub fn apply(phys: &mut PhysicsWorld, vehicle: &mut Vehicle, input: &InputIntent) {
    let tuning = &config::PLANE;

    if input.move_forward {
        vehicle.throttle = (vehicle.throttle + tuning.throttle_step).min(1.0);
    }
    if input.move_backward {
        vehicle.throttle = (vehicle.throttle - tuning.throttle_step).max(0.0);
    }

    let Some(body) = phys.body_mut(vehicle.body) else { return };

    let rot = *body.rotation();
    let forward = forward3(&rot);
    let right = right3(&rot);
    let up = up3(&rot);

    if vehicle.throttle > 0.0 {
        body.apply_impulse(forward * vehicle.throttle * tuning.accel, true);
    }

    let speed = body.linvel().norm();
    if speed > tuning.min_speed {
        let lift = (speed * tuning.lift_coef).min(tuning.max_lift);
        body.apply_impulse(vector![0.0, lift, 0.0], true);
    }

    // Elevator.
    if input.jump {
        body.apply_torque_impulse(right * tuning.pitch_speed, true);
    }
    if input.descend {
        body.apply_torque_impulse(-right * tuning.pitch_speed, true);
    }

    // Banked turn: roll about the nose, yaw coupled in the same sense.
    if input.move_left {
        body.apply_torque_impulse(forward * tuning.turn_speed, true);
        body.apply_torque_impulse(up * tuning.turn_speed * YAW_COUPLING, true);
    }
    if input.move_right {
        body.apply_torque_impulse(-forward * tuning.turn_speed, true);
        body.apply_torque_impulse(-up * tuning.turn_speed * YAW_COUPLING, true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::state::VehicleKind;

    fn plane(phys: &mut PhysicsWorld) -> Vehicle {
        let position = vector![0.0, 1.0, 0.0];
        let body = phys.spawn_vehicle_body(VehicleKind::Plane, position);
        Vehicle::new("vehicle_0".into(), VehicleKind::Plane, body, position)
    }

    #[test]
    fn throttle_ratchets_and_clamps() {
        let mut phys = PhysicsWorld::new();
        let mut vehicle = plane(&mut phys);

        let forward = InputIntent { move_forward: true, ..Default::default() };
        for _ in 0..10 {
            apply(&mut phys, &mut vehicle, &forward);
        }
        assert_relative_eq!(vehicle.throttle, 10.0 * config::PLANE.throttle_step, epsilon = 1e-5);

        for _ in 0..200 {
            apply(&mut phys, &mut vehicle, &forward);
        }
        assert_relative_eq!(vehicle.throttle, 1.0);

        let backward = InputIntent { move_backward: true, ..Default::default() };
        for _ in 0..200 {
            apply(&mut phys, &mut vehicle, &backward);
        }
        assert_relative_eq!(vehicle.throttle, 0.0);
    }

    #[test]
    fn zero_throttle_means_zero_thrust() {
        let mut phys = PhysicsWorld::new();
        let mut vehicle = plane(&mut phys);

        apply(&mut phys, &mut vehicle, &InputIntent::default());
        let v = *phys.body(vehicle.body).unwrap().linvel();
        assert_relative_eq!(v.norm(), 0.0);
    }

    #[test]
    fn thrust_follows_the_nose() {
        let mut phys = PhysicsWorld::new();
        let mut vehicle = plane(&mut phys);
        vehicle.throttle = 1.0;

        apply(&mut phys, &mut vehicle, &InputIntent::default());
        let v = *phys.body(vehicle.body).unwrap().linvel();
        assert!(v.z < 0.0);
    }

    #[test]
    fn lift_needs_airspeed() {
        let mut phys = PhysicsWorld::new();
        let mut vehicle = plane(&mut phys);

        // Below stall speed: no lift.
        phys.body_mut(vehicle.body)
            .unwrap()
            .set_linvel(vector![0.0, 0.0, -config::PLANE.min_speed * 0.5], true);
        apply(&mut phys, &mut vehicle, &InputIntent::default());
        assert_relative_eq!(phys.body(vehicle.body).unwrap().linvel().y, 0.0, epsilon = 1e-5);

        // Above it: upward impulse proportional to speed.
        phys.body_mut(vehicle.body)
            .unwrap()
            .set_linvel(vector![0.0, 0.0, -config::PLANE.min_speed * 2.0], true);
        apply(&mut phys, &mut vehicle, &InputIntent::default());
        assert!(phys.body(vehicle.body).unwrap().linvel().y > 0.0);
    }

    #[test]
    fn banking_couples_roll_and_yaw() {
        let mut phys = PhysicsWorld::new();
        let mut vehicle = plane(&mut phys);

        let input = InputIntent { move_left: true, ..Default::default() };
        apply(&mut phys, &mut vehicle, &input);

        let w = *phys.body(vehicle.body).unwrap().angvel();
        // Roll about −Z forward shows up on the Z axis, yaw on Y, same sense.
        assert!(w.z != 0.0);
        assert!(w.y > 0.0);
    }

    #[test]
    fn elevator_pitches_about_the_wings() {
        let mut phys = PhysicsWorld::new();
        let mut vehicle = plane(&mut phys);

        let input = InputIntent { jump: true, ..Default::default() };
        apply(&mut phys, &mut vehicle, &input);
        let nose_up = phys.body(vehicle.body).unwrap().angvel().x;
        assert!(nose_up > 0.0);

        phys.body_mut(vehicle.body)
            .unwrap()
            .set_angvel(vector![0.0, 0.0, 0.0], true);
        let input = InputIntent { descend: true, ..Default::default() };
        apply(&mut phys, &mut vehicle, &input);
        assert!(phys.body(vehicle.body).unwrap().angvel().x < 0.0);
    }
}
