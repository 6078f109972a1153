// ---------------------------------------------
// level.rs — WORLD INIT
// ---------------------------------------------
// Populates the freshly-created world: scattered fixed obstacles, the vehicle
// roster, and the ghost roster. Runs once at startup, before the first tick;
// vehicles and ghosts are never destroyed afterwards.

use rand::Rng;
use rapier3d::prelude::vector;
use tracing::info;

use crate::config;
use crate::physics::PhysicsWorld;
use crate::state::{GameState, Ghost, GhostShape, LevelObject, Vehicle, VehicleKind};

const GHOST_ROSTER: [(GhostShape, f32, [f32; 3]); 5] = [
    (GhostShape::Box { w: 1.0, h: 1.0, d: 1.0 }, 4.0, [0.9, 0.3, 0.2]),
    (GhostShape::Box { w: 0.6, h: 0.6, d: 0.6 }, 2.0, [0.2, 0.7, 0.9]),
    (GhostShape::Sphere { r: 0.5 }, 3.0, [0.3, 0.9, 0.4]),
    (GhostShape::Cylinder { r: 0.4, h: 1.2 }, 6.0, [0.9, 0.8, 0.2]),
    // Too heavy to carry; furniture, effectively.
    (GhostShape::Box { w: 2.0, h: 1.2, d: 1.2 }, 40.0, [0.6, 0.4, 0.8]),
];

/// Planar spots obstacles must keep clear of: the player spawn, the three
/// vehicle spawns, and the ghost row.
const CLEAR_ZONES: [[f32; 2]; 5] =
    [[0.0, 0.0], [8.0, 5.0], [-10.0, 8.0], [0.0, -18.0], [0.0, 12.0]];
const CLEAR_RADIUS: f32 = 6.0;

pub fn build_world(state: &mut GameState, phys: &mut PhysicsWorld) {
    let mut rng = rand::thread_rng();

    // Fixed obstacle cubes, top surface at y = 2, re-rolled off the clear zones.
    let h = config::OBSTACLE_HALF_EXTENT;
    for _ in 0..config::OBSTACLE_COUNT {
        let (x, z) = loop {
            let x = rng.gen_range(-config::OBSTACLE_SPREAD..config::OBSTACLE_SPREAD);
            let z = rng.gen_range(-config::OBSTACLE_SPREAD..config::OBSTACLE_SPREAD);
            let clear = CLEAR_ZONES
                .iter()
                .all(|[cx, cz]| (x - cx).hypot(z - cz) > CLEAR_RADIUS);
            if clear {
                break (x, z);
            }
        };
        let position = vector![x, h, z];
        let body = phys.insert_fixed_cuboid(position, vector![h, h, h]);
        let shade = rng.gen_range(0.4..0.8);
        state.level.push(LevelObject {
            body,
            position,
            size: vector![2.0 * h, 2.0 * h, 2.0 * h],
            color: [shade, shade, shade],
        });
    }

    let roster = [
        (VehicleKind::Car, vector![8.0, 1.0, 5.0]),
        (VehicleKind::Helicopter, vector![-10.0, 1.0, 8.0]),
        (VehicleKind::Plane, vector![0.0, 1.0, -18.0]),
    ];
    for (kind, position) in roster {
        let id = state.new_vehicle_id();
        let body = phys.spawn_vehicle_body(kind, position);
        state
            .vehicles
            .insert(id.clone(), Vehicle::new(id, kind, body, position));
    }

    for (i, (shape, mass, color)) in GHOST_ROSTER.iter().enumerate() {
        let id = state.new_ghost_id();
        let position = vector![-4.0 + 2.0 * i as f32, 1.0, 12.0];
        let body = phys.spawn_ghost_body(shape, *mass, position);
        state.ghosts.insert(
            id.clone(),
            Ghost {
                id,
                body,
                shape: *shape,
                mass: *mass,
                color: *color,
                position,
                rotation: nalgebra::UnitQuaternion::identity(),
                velocity: vector![0.0, 0.0, 0.0],
                carrier: None,
            },
        );
    }

    info!(
        "🌎 world ready: {} obstacles, {} vehicles, {} ghosts",
        state.level.len(),
        state.vehicles.len(),
        state.ghosts.len()
    );
}
