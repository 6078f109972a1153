// ==============================================================================
// car.rs — GROUND VEHICLE
// ------------------------------------------------------------------------------
// Arcade car: forward/reverse impulses along the chassis' planar forward and
// a yaw torque for steering. Steering only bites while rolling (or while the
// throttle is held, so a parked car can pivot out of a wall). A constant
// downward impulse keeps the chassis planted; the heavy damping on the body
// does the rest.
// ==============================================================================

use rapier3d::prelude::vector;

use crate::config;
use crate::control::planar_forward;
use crate::physics::PhysicsWorld;
use crate::protocol::InputIntent;
use crate::state::Vehicle;

/// Reverse gets a single share of CAR.speed, forward a double.
const FORWARD_GEAR: f32 = 2.0;

/// Keeps the chassis pressed to the ground over crests.
const GROUND_STICK: f32 = -1.0;

pub fn apply(phys: &mut PhysicsWorld, vehicle: &mut Vehicle, input: &InputIntent) {
    let Some(body) = phys.body_mut(vehicle.body) else { return };

    let forward = planar_forward(body.rotation());
    let throttle_held = input.move_forward || input.move_backward;

    if input.move_forward {
        body.apply_impulse(forward * config::CAR.speed * FORWARD_GEAR, true);
    }
    if input.move_backward {
        body.apply_impulse(-forward * config::CAR.speed, true);
    }

    let v = *body.linvel();
    let planar_speed = (v.x * v.x + v.z * v.z).sqrt();
    if planar_speed > config::CAR.min_turn_speed || throttle_held {
        if input.move_left {
            body.apply_torque_impulse(vector![0.0, config::CAR.turn_speed, 0.0], true);
        }
        if input.move_right {
            body.apply_torque_impulse(vector![0.0, -config::CAR.turn_speed, 0.0], true);
        }
    }

    body.apply_impulse(vector![0.0, GROUND_STICK, 0.0], true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::VehicleKind;

    fn car(phys: &mut PhysicsWorld) -> Vehicle {
        let position = vector![0.0, 1.0, 0.0];
        let body = phys.spawn_vehicle_body(VehicleKind::Car, position);
        Vehicle::new("vehicle_0".into(), VehicleKind::Car, body, position)
    }

    #[test]
    fn throttle_accelerates_along_forward() {
        let mut phys = PhysicsWorld::new();
        let mut vehicle = car(&mut phys);

        let input = InputIntent { move_forward: true, ..Default::default() };
        apply(&mut phys, &mut vehicle, &input);

        // Identity rotation: forward is −Z.
        let v = *phys.body(vehicle.body).unwrap().linvel();
        assert!(v.z < 0.0);

        // Reverse is geared at half the forward impulse.
        let forward_dv = v.z.abs();
        phys.body_mut(vehicle.body)
            .unwrap()
            .set_linvel(vector![0.0, 0.0, 0.0], true);
        let input = InputIntent { move_backward: true, ..Default::default() };
        apply(&mut phys, &mut vehicle, &input);
        let v = *phys.body(vehicle.body).unwrap().linvel();
        assert!(v.z > 0.0);
        assert!(v.z < forward_dv);
    }

    #[test]
    fn steering_needs_motion_or_throttle() {
        let mut phys = PhysicsWorld::new();
        let mut vehicle = car(&mut phys);

        // Parked, coasting below the gate, no throttle: the wheel does nothing.
        let input = InputIntent { move_left: true, ..Default::default() };
        apply(&mut phys, &mut vehicle, &input);
        assert_eq!(phys.body(vehicle.body).unwrap().angvel().y, 0.0);

        // Same input while holding throttle: yaw torque lands.
        let input = InputIntent {
            move_left: true,
            move_forward: true,
            ..Default::default()
        };
        apply(&mut phys, &mut vehicle, &input);
        assert!(phys.body(vehicle.body).unwrap().angvel().y > 0.0);
    }

    #[test]
    fn steering_works_while_rolling() {
        let mut phys = PhysicsWorld::new();
        let mut vehicle = car(&mut phys);
        phys.body_mut(vehicle.body)
            .unwrap()
            .set_linvel(vector![0.0, 0.0, -5.0], true);

        let input = InputIntent { move_right: true, ..Default::default() };
        apply(&mut phys, &mut vehicle, &input);
        assert!(phys.body(vehicle.body).unwrap().angvel().y < 0.0);
    }
}
