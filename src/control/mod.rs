//! control - per-context input resolution (on foot / car / helicopter / plane)

use std::collections::HashMap;

use nalgebra::UnitQuaternion;
use rapier3d::prelude::{Real, Vector, vector};

use crate::physics::PhysicsWorld;
use crate::protocol::InputIntent;
use crate::state::{ControlContext, Player, Vehicle, VehicleKind};

pub mod car;
pub mod helicopter;
pub mod on_foot;
pub mod plane;

/// Apply every player's latest intent for this tick, dispatched on their
/// control context. Runs just before the physics step; a missing vehicle or
/// body means the entity is mid-teardown and the input is dropped.
pub fn resolve(
    phys: &mut PhysicsWorld,
    players: &mut HashMap<String, Player>,
    vehicles: &mut HashMap<String, Vehicle>,
) {
    for player in players.values_mut() {
        let Some(input) = player.last_input else { continue };
        match player.context.clone() {
            ControlContext::OnFoot => on_foot::apply(phys, player, &input),
            ControlContext::Driving { vehicle } => {
                let Some(vehicle) = vehicles.get_mut(&vehicle) else { continue };
                match vehicle.kind {
                    VehicleKind::Car => car::apply(phys, vehicle, &input),
                    VehicleKind::Helicopter => helicopter::apply(phys, vehicle, &input),
                    VehicleKind::Plane => plane::apply(phys, vehicle, &input),
                }
            }
        }
    }
}

// ==============================================================================
// Shared basis helpers. Convention: local forward is −Z in a Y-up world.
// ==============================================================================

pub(crate) fn forward3(rot: &UnitQuaternion<Real>) -> Vector<Real> {
    rot * vector![0.0, 0.0, -1.0]
}

pub(crate) fn right3(rot: &UnitQuaternion<Real>) -> Vector<Real> {
    rot * vector![1.0, 0.0, 0.0]
}

pub(crate) fn up3(rot: &UnitQuaternion<Real>) -> Vector<Real> {
    rot * vector![0.0, 1.0, 0.0]
}

/// Flatten a direction onto the XZ plane and normalize. Falls back to −Z
/// when the direction is (near) vertical.
pub(crate) fn flatten(dir: Vector<Real>) -> Vector<Real> {
    let planar = vector![dir.x, 0.0, dir.z];
    let len = planar.norm();
    if len < 1e-6 {
        vector![0.0, 0.0, -1.0]
    } else {
        planar / len
    }
}

/// Planar forward derived from a body quaternion.
pub(crate) fn planar_forward(rot: &UnitQuaternion<Real>) -> Vector<Real> {
    flatten(forward3(rot))
}

/// Sum the WASD booleans into a unit move direction, or None when idle.
pub(crate) fn wasd_direction(
    forward: Vector<Real>,
    right: Vector<Real>,
    input: &InputIntent,
) -> Option<Vector<Real>> {
    let mut dir = vector![0.0, 0.0, 0.0];
    if input.move_forward {
        dir += forward;
    }
    if input.move_backward {
        dir -= forward;
    }
    if input.move_right {
        dir += right;
    }
    if input.move_left {
        dir -= right;
    }
    let len = dir.norm();
    if len < 1e-6 { None } else { Some(dir / len) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn identity_rotation_faces_negative_z() {
        let rot = UnitQuaternion::identity();
        let f = forward3(&rot);
        assert_relative_eq!(f.z, -1.0, epsilon = 1e-6);
        assert_relative_eq!(right3(&rot).x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(up3(&rot).y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn flatten_strips_pitch_and_renormalizes() {
        let f = flatten(vector![0.0, -0.8, -0.6]);
        assert_relative_eq!(f.y, 0.0);
        assert_relative_eq!(f.norm(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(f.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn flatten_of_straight_down_falls_back() {
        let f = flatten(vector![0.0, -1.0, 0.0]);
        assert_relative_eq!(f.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn diagonal_input_is_unit_length() {
        let forward = vector![0.0, 0.0, -1.0];
        let right = vector![1.0, 0.0, 0.0];
        let input = InputIntent {
            move_forward: true,
            move_right: true,
            ..Default::default()
        };
        let dir = wasd_direction(forward, right, &input).unwrap();
        assert_relative_eq!(dir.norm(), 1.0, epsilon = 1e-6);
        assert!(dir.z < 0.0 && dir.x > 0.0);
    }

    #[test]
    fn opposed_inputs_cancel_to_none() {
        let forward = vector![0.0, 0.0, -1.0];
        let right = vector![1.0, 0.0, 0.0];
        let input = InputIntent {
            move_forward: true,
            move_backward: true,
            ..Default::default()
        };
        assert!(wasd_direction(forward, right, &input).is_none());
    }
}
