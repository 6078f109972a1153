// ==============================================================================
// config.rs — SIMULATION TUNING
// ------------------------------------------------------------------------------
// Every knob of the simulation lives here. Force-like constants are per-tick
// impulses calibrated at TICK_RATE against rapier's density-derived masses;
// retune them together if either changes.
// ==============================================================================

/// Simulation frequency (Hz). Snapshots go out at the same rate.
pub const TICK_RATE: f32 = 60.0;

/// Fixed integration step (seconds).
pub const TICK_DT: f32 = 1.0 / TICK_RATE;

/// Gravity, −Y down (m/s²).
pub const GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default WebSocket listen port (override with the PORT env var).
pub const DEFAULT_PORT: u16 = 8080;

// ------------------------------------------------------------------------------
// World layout
// ------------------------------------------------------------------------------

/// Ground slab half-extents (m). Top surface sits at y = 0.
pub const GROUND_HALF_EXTENTS: [f32; 3] = [50.0, 0.5, 50.0];

/// Number of random fixed obstacle cubes scattered at init.
pub const OBSTACLE_COUNT: usize = 10;

/// Obstacle half-extents (m), placed with y = 1.
pub const OBSTACLE_HALF_EXTENT: f32 = 1.0;

/// Obstacles land within ±this on X and Z.
pub const OBSTACLE_SPREAD: f32 = 40.0;

/// Anything beyond this distance from the origin is outside the playable
/// world. Projectiles past it are culled; runaway dynamic bodies are reset.
pub const WORLD_BOUND: f32 = 500.0;

/// Off-world parking spot for the bodies of players who are driving.
pub const PARKED_BODY_POS: [f32; 3] = [0.0, -900.0, 0.0];

// ------------------------------------------------------------------------------
// Player
// ------------------------------------------------------------------------------

/// Capsule height, top to bottom (m).
pub const PLAYER_HEIGHT: f32 = 1.8;

/// Capsule radius (m).
pub const PLAYER_RADIUS: f32 = 0.4;

/// Target ground speed (m/s).
pub const PLAYER_SPEED: f32 = 10.0;

/// Upward jump impulse (N·s).
pub const JUMP_FORCE: f32 = 5.0;

pub const MAX_HEALTH: i32 = 100;

/// Linear and angular damping on the player capsule.
pub const PLAYER_DAMPING: f32 = 10.0;

pub const PLAYER_FRICTION: f32 = 0.5;
pub const PLAYER_RESTITUTION: f32 = 0.0;

/// Where players appear on JOIN and respawn on death.
pub const SPAWN_POINT: [f32; 3] = [0.0, 5.0, 0.0];

/// Grounded iff the closest downward ray hit is within this of the capsule
/// center (lower hemisphere accounted for).
pub const GROUND_EPSILON: f32 = 0.1;

/// Downward ground rays probe this far past the capsule half-height.
pub const GROUND_PROBE: f32 = 0.5;

// ------------------------------------------------------------------------------
// Weapon
// ------------------------------------------------------------------------------

/// Minimum seconds between shots.
pub const FIRE_RATE: f32 = 0.25;

/// Muzzle velocity (m/s).
pub const PROJECTILE_SPEED: f32 = 40.0;

/// Projectile ball radius (m).
pub const PROJECTILE_RADIUS: f32 = 0.2;

pub const PROJECTILE_DAMAGE: i32 = 25;

/// Projectiles expire this many seconds after spawn.
pub const PROJECTILE_TTL: f32 = 5.0;

// ------------------------------------------------------------------------------
// Vehicles
// ------------------------------------------------------------------------------

/// Players can board a vehicle within this distance (m).
pub const INTERACTION_RANGE: f32 = 5.0;

pub struct CarTuning {
    pub speed: f32,              // forward impulse per tick (doubled forward, single reverse)
    pub turn_speed: f32,         // yaw torque impulse per tick
    pub min_turn_speed: f32,     // planar speed below which steering needs throttle
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub half_extents: [f32; 3],  // chassis collider (m)
}

pub const CAR: CarTuning = CarTuning {
    speed: 0.5,
    turn_speed: 0.35,
    min_turn_speed: 0.5,
    linear_damping: 2.0,
    angular_damping: 2.0,
    half_extents: [1.0, 0.5, 2.0],
};

pub struct HeliTuning {
    pub lift: f32,               // climb impulse per tick
    pub hover_trim: f32,         // idle upward impulse while the engine runs
    pub thrust: f32,             // planar impulse per tick
    pub tilt_angle: f32,         // pitch torque impulse per tick
    pub turn_speed: f32,         // yaw torque impulse per tick
    pub max_altitude: f32,       // no upward force above this (m)
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub half_extents: [f32; 3],
}

pub const HELICOPTER: HeliTuning = HeliTuning {
    lift: 2.0,
    hover_trim: 2.0,
    thrust: 0.8,
    tilt_angle: 0.4,
    turn_speed: 0.6,
    max_altitude: 60.0,
    linear_damping: 1.0,
    angular_damping: 1.5,
    half_extents: [1.0, 0.6, 1.6],
};

pub struct PlaneTuning {
    pub accel: f32,              // thrust impulse per tick at full throttle
    pub min_speed: f32,          // below this there is no lift (m/s)
    pub lift_coef: f32,          // lift impulse per (m/s) of airspeed
    pub max_lift: f32,           // lift impulse cap
    pub pitch_speed: f32,        // pitch torque impulse per tick
    pub turn_speed: f32,         // roll torque impulse per tick (yaw couples at half)
    pub throttle_step: f32,      // throttle change per tick of held input
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub half_extents: [f32; 3],
}

pub const PLANE: PlaneTuning = PlaneTuning {
    accel: 0.8,
    min_speed: 10.0,
    lift_coef: 0.08,
    max_lift: 15.0,
    pitch_speed: 0.4,
    turn_speed: 0.5,
    throttle_step: 0.02,
    linear_damping: 0.5,
    angular_damping: 1.0,
    half_extents: [1.2, 0.4, 1.8],
};

// ------------------------------------------------------------------------------
// Ghosts (carriables)
// ------------------------------------------------------------------------------

pub const GHOST_FRICTION: f32 = 0.8;
pub const GHOST_RESTITUTION: f32 = 0.2;

/// Players can grab a ghost within this distance (m).
pub const GHOST_INTERACTION_RANGE: f32 = 3.0;

/// Ghosts heavier than this cannot be picked up (kg).
pub const MAX_CARRY_MASS: f32 = 10.0;

/// Held ghosts float this far along the carrier's look direction (m).
pub const CARRY_DISTANCE: f32 = 2.0;

/// Throw release speed (m/s).
pub const THROW_FORCE: f32 = 15.0;
