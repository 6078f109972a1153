// ==============================================================================
// physics.rs — RIGID-BODY WORLD (RAPIER INTEGRATION)
// ------------------------------------------------------------------------------
// Owns the single rapier world shared by every entity class. The rest of the
// server never touches rapier sets directly: bodies are created through the
// per-class spawn recipes below, mutated through handles, and removed through
// remove_body so colliders and islands stay consistent.
//
// Step pipeline (per tick, driven by tick.rs):
// 1) control::* has already applied impulses/velocities for this tick.
// 2) step() integrates once at the fixed dt.
// 3) A safety pass resets any dynamic body that escaped to non-finite or
//    absurd coordinates. Kinematic bodies are exempt: parked driver capsules
//    and carried ghosts legitimately live at sentinel positions.
// ==============================================================================

use rapier3d::prelude::*;
use tracing::warn;

use crate::config;
use crate::state::{GhostShape, VehicleKind};

/// Closest downward ray hit under a player capsule.
#[derive(Debug, Clone, Copy)]
pub struct GroundContact {
    pub distance: f32,          // ray origin (capsule center) to hit
    pub normal: Vector<Real>,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    pub query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        let [gx, gy, gz] = config::GRAVITY;
        let mut world = Self {
            gravity: vector![gx, gy, gz],
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        };

        // Ground slab, top surface at y = 0.
        let [hx, hy, hz] = config::GROUND_HALF_EXTENTS;
        world.insert_fixed_cuboid(vector![0.0, -hy, 0.0], vector![hx, hy, hz]);

        world
    }

    pub fn insert_fixed_cuboid(
        &mut self,
        position: Vector<Real>,
        half_extents: Vector<Real>,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::fixed().translation(position).build();
        let handle = self.bodies.insert(rb);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .friction(1.0)
            .restitution(0.0)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    // ===========================================================================
    // Spawn recipes, one per entity class
    // ===========================================================================

    pub fn spawn_player_body(&mut self, position: Vector<Real>) -> RigidBodyHandle {
        let half_height = (config::PLAYER_HEIGHT - 2.0 * config::PLAYER_RADIUS) / 2.0;
        let rb = RigidBodyBuilder::dynamic()
            .translation(position)
            .linear_damping(config::PLAYER_DAMPING)
            .angular_damping(config::PLAYER_DAMPING)
            .lock_rotations()
            .build();
        let handle = self.bodies.insert(rb);
        let collider = ColliderBuilder::capsule_y(half_height, config::PLAYER_RADIUS)
            .friction(config::PLAYER_FRICTION)
            .restitution(config::PLAYER_RESTITUTION)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    pub fn spawn_vehicle_body(
        &mut self,
        kind: VehicleKind,
        position: Vector<Real>,
    ) -> RigidBodyHandle {
        let (linear_damping, angular_damping, half_extents) = match kind {
            VehicleKind::Car => {
                (config::CAR.linear_damping, config::CAR.angular_damping, config::CAR.half_extents)
            }
            VehicleKind::Helicopter => (
                config::HELICOPTER.linear_damping,
                config::HELICOPTER.angular_damping,
                config::HELICOPTER.half_extents,
            ),
            VehicleKind::Plane => (
                config::PLANE.linear_damping,
                config::PLANE.angular_damping,
                config::PLANE.half_extents,
            ),
        };

        let rb = RigidBodyBuilder::dynamic()
            .translation(position)
            .linear_damping(linear_damping)
            .angular_damping(angular_damping)
            .ccd_enabled(true)
            .build();
        let handle = self.bodies.insert(rb);
        let [hx, hy, hz] = half_extents;
        // Zero chassis friction: vehicle handling comes entirely from the
        // per-tick impulses, never from rapier contact friction.
        let collider = ColliderBuilder::cuboid(hx, hy, hz)
            .friction(0.0)
            .friction_combine_rule(CoefficientCombineRule::Min)
            .restitution(0.0)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    pub fn spawn_ghost_body(
        &mut self,
        shape: &GhostShape,
        mass: f32,
        position: Vector<Real>,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic().translation(position).build();
        let handle = self.bodies.insert(rb);
        let builder = match *shape {
            GhostShape::Box { w, h, d } => ColliderBuilder::cuboid(w / 2.0, h / 2.0, d / 2.0),
            GhostShape::Sphere { r } => ColliderBuilder::ball(r),
            GhostShape::Cylinder { r, h } => ColliderBuilder::cylinder(h / 2.0, r),
        };
        let collider = builder
            .mass(mass)
            .friction(config::GHOST_FRICTION)
            .restitution(config::GHOST_RESTITUTION)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    pub fn spawn_projectile_body(
        &mut self,
        origin: Vector<Real>,
        velocity: Vector<Real>,
    ) -> RigidBodyHandle {
        let rb = RigidBodyBuilder::dynamic()
            .translation(origin)
            .linvel(velocity)
            .linear_damping(0.0)
            .angular_damping(0.0)
            .ccd_enabled(true)
            .build();
        let handle = self.bodies.insert(rb);
        let collider = ColliderBuilder::ball(config::PROJECTILE_RADIUS)
            .density(1.0)
            .restitution(0.4)
            .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    // ===========================================================================
    // Handle plumbing
    // ===========================================================================

    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            true, // remove attached colliders
        );
    }

    /// Park a body: no integration until set_dynamic.
    pub fn set_kinematic(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_body_type(RigidBodyType::KinematicPositionBased, true);
        }
    }

    pub fn set_dynamic(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_body_type(RigidBodyType::Dynamic, true);
        }
    }

    // ===========================================================================
    // Queries
    // ===========================================================================

    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    /// Five downward rays from the capsule center: middle plus ±0.7R on each
    /// planar axis, so edge contact on a ledge still counts. Returns the
    /// closest hit within the probe distance, ignoring the player's own body
    /// and any sensors.
    pub fn ground_scan(&self, handle: RigidBodyHandle) -> Option<GroundContact> {
        let body = self.bodies.get(handle)?;
        let center = *body.translation();

        let r = config::PLAYER_RADIUS * 0.7;
        let offsets = [
            vector![0.0, 0.0, 0.0],
            vector![r, 0.0, 0.0],
            vector![-r, 0.0, 0.0],
            vector![0.0, 0.0, r],
            vector![0.0, 0.0, -r],
        ];

        let max_dist = config::PLAYER_HEIGHT / 2.0 + config::GROUND_PROBE;
        let dir = vector![0.0, -1.0, 0.0];
        let filter = QueryFilter::default()
            .exclude_rigid_body(handle)
            .exclude_sensors();

        let mut closest: Option<GroundContact> = None;
        for offset in offsets {
            let ray = Ray::new((center + offset).into(), dir);
            if let Some((_, hit)) = self.query_pipeline.cast_ray_and_get_normal(
                &self.bodies,
                &self.colliders,
                &ray,
                max_dist,
                true,
                filter,
            ) {
                if closest.map_or(true, |c| hit.time_of_impact < c.distance) {
                    closest = Some(GroundContact {
                        distance: hit.time_of_impact,
                        normal: hit.normal,
                    });
                }
            }
        }
        closest
    }

    // ===========================================================================
    // Integration
    // ===========================================================================

    pub fn step(&mut self, dt: Real) {
        let hooks = ();
        let mut events = ();

        self.pipeline.step(
            &self.gravity,
            &IntegrationParameters {
                dt,
                ..IntegrationParameters::default()
            },
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.query_pipeline),
            &mut events,
            &hooks,
        );

        // Safety: catch dynamic bodies that exploded to insane coordinates.
        let limit = config::WORLD_BOUND * 2.0;
        let [sx, sy, sz] = config::SPAWN_POINT;
        for (_, body) in self.bodies.iter_mut() {
            if !body.is_dynamic() {
                continue;
            }
            let pos = *body.translation();
            let bad = !pos.x.is_finite()
                || !pos.y.is_finite()
                || !pos.z.is_finite()
                || pos.x.abs() > limit
                || pos.y.abs() > limit
                || pos.z.abs() > limit;
            if bad {
                body.set_translation(vector![sx, sy, sz], true);
                body.set_linvel(vector![0.0, 0.0, 0.0], true);
                body.set_angvel(vector![0.0, 0.0, 0.0], true);
                warn!("⚠️ reset runaway body to spawn");
            }
        }
    }
}
