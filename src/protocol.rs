// ==============================================================================
// protocol.rs — WIRE MESSAGES
// ------------------------------------------------------------------------------
// Every WebSocket frame is one JSON object tagged by "type". Client-bound tags
// are SCREAMING_SNAKE_CASE, payload fields camelCase. Parsing failures are the
// caller's problem: a bad frame is logged and dropped, never answered.
// ==============================================================================

use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<Vector3<f32>> for Vec3 {
    fn from(v: Vector3<f32>) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vec3> for Vector3<f32> {
    fn from(v: Vec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }
}

impl From<UnitQuaternion<f32>> for Quat {
    fn from(q: UnitQuaternion<f32>) -> Self {
        Self { x: q.i, y: q.j, z: q.k, w: q.w }
    }
}

impl From<Quat> for UnitQuaternion<f32> {
    fn from(q: Quat) -> Self {
        UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
    }
}

/// Latest per-frame intent from a client. Booleans default to false so a
/// client may send only the keys it holds down.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputIntent {
    #[serde(default)]
    pub move_forward: bool,
    #[serde(default)]
    pub move_backward: bool,
    #[serde(default)]
    pub move_left: bool,
    #[serde(default)]
    pub move_right: bool,
    #[serde(default)]
    pub jump: bool,
    #[serde(default, alias = "shift")]
    pub descend: bool,
    #[serde(default)]
    pub look_direction: Option<Vec3>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join,
    Input { input: InputIntent },
    Fire { direction: Vec3, origin: Vec3 },
    EnterVehicle { vehicle_id: String },
    ExitVehicle,
    GrabGhost { ghost_id: String },
    DropGhost,
    ThrowGhost { direction: Vec3 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub id: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub health: i32,
    pub look_direction: Vec3,
    pub vehicle: Option<String>,
    pub carrying: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSnapshot {
    pub id: String,
    pub kind: &'static str,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub driver: Option<String>,
    pub engine_on: bool,
    pub throttle: f32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum GhostShapeSnapshot {
    Box { w: f32, h: f32, d: f32 },
    Sphere { r: f32 },
    Cylinder { r: f32, h: f32 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostSnapshot {
    pub id: String,
    pub shape: GhostShapeSnapshot,
    pub mass: f32,
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    pub color: [f32; 3],
    pub carrier: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileSnapshot {
    pub id: String,
    pub position: Vec3,
    pub velocity: Vec3,
    pub owner: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelObjectSnapshot {
    pub position: Vec3,
    pub size: Vec3,
    pub color: [f32; 3],
}

/// One full world frame, broadcast every tick.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub tick: u64,
    pub players: Vec<PlayerSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub vehicles: Vec<VehicleSnapshot>,
    pub ghosts: Vec<GhostSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Init { player_id: String, level: Vec<LevelObjectSnapshot> },
    PlayerJoined { player: PlayerSnapshot },
    PlayerLeft { player_id: String },
    ProjectileSpawn { projectile: ProjectileSnapshot },
    ProjectileRemove { projectile_id: String },
    Hit { target: String, damage: i32, health: i32 },
    VehicleUpdate { vehicle: VehicleSnapshot },
    GhostUpdate { ghost: GhostSnapshot },
    GameState { state: WorldSnapshot },
}
