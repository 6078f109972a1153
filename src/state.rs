// src/state.rs
//
// Authoritative world state: one record per live entity, each owning exactly
// one rigid-body handle. Records mirror their body's pose once per tick
// (tick.rs) so snapshot building and hit tests never touch rapier directly.

use std::collections::HashMap;
use std::time::Instant;

use nalgebra::UnitQuaternion;
use rand::Rng;
use rapier3d::prelude::{Real, RigidBodyHandle, Vector, vector};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::config;
use crate::protocol::{
    GhostShapeSnapshot, GhostSnapshot, InputIntent, LevelObjectSnapshot, PlayerSnapshot,
    ProjectileSnapshot, ServerMessage, VehicleSnapshot, WorldSnapshot,
};

pub type ClientTx = UnboundedSender<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleKind {
    Car,
    Helicopter,
    Plane,
}

impl VehicleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleKind::Car => "car",
            VehicleKind::Helicopter => "helicopter",
            VehicleKind::Plane => "plane",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GhostShape {
    Box { w: f32, h: f32, d: f32 },
    Sphere { r: f32 },
    Cylinder { r: f32, h: f32 },
}

impl GhostShape {
    pub fn snapshot(&self) -> GhostShapeSnapshot {
        match *self {
            GhostShape::Box { w, h, d } => GhostShapeSnapshot::Box { w, h, d },
            GhostShape::Sphere { r } => GhostShapeSnapshot::Sphere { r },
            GhostShape::Cylinder { r, h } => GhostShapeSnapshot::Cylinder { r, h },
        }
    }
}

/// How the input resolver interprets this player's intent. Carrying is
/// tracked separately on the record: a player on foot may or may not hold a
/// ghost, but a driver never does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlContext {
    OnFoot,
    Driving { vehicle: String },
}

pub struct Player {
    pub id: String,
    pub body: RigidBodyHandle,
    pub position: Vector<Real>,
    pub rotation: UnitQuaternion<Real>,
    pub velocity: Vector<Real>,
    pub health: i32,
    pub last_fire_time: f64,
    pub look_dir: Vector<Real>,
    pub context: ControlContext,
    pub carrying: Option<String>,
    pub grounded: bool,
    pub ground_normal: Vector<Real>,
    pub ground_distance: f32,
    pub last_input: Option<InputIntent>,
}

impl Player {
    pub fn new(id: String, body: RigidBodyHandle) -> Self {
        let [sx, sy, sz] = config::SPAWN_POINT;
        Self {
            id,
            body,
            position: vector![sx, sy, sz],
            rotation: UnitQuaternion::identity(),
            velocity: vector![0.0, 0.0, 0.0],
            health: config::MAX_HEALTH,
            last_fire_time: f64::NEG_INFINITY,
            look_dir: vector![0.0, 0.0, -1.0],
            context: ControlContext::OnFoot,
            carrying: None,
            grounded: false,
            ground_normal: vector![0.0, 1.0, 0.0],
            ground_distance: f32::INFINITY,
            last_input: None,
        }
    }
}

pub struct Vehicle {
    pub id: String,
    pub kind: VehicleKind,
    pub body: RigidBodyHandle,
    pub position: Vector<Real>,
    pub rotation: UnitQuaternion<Real>,
    pub velocity: Vector<Real>,
    pub driver: Option<String>,
    pub engine_on: bool,     // helicopter only
    pub throttle: f32,       // plane only, 0..1
}

impl Vehicle {
    pub fn new(id: String, kind: VehicleKind, body: RigidBodyHandle, position: Vector<Real>) -> Self {
        Self {
            id,
            kind,
            body,
            position,
            rotation: UnitQuaternion::identity(),
            velocity: vector![0.0, 0.0, 0.0],
            driver: None,
            engine_on: false,
            throttle: 0.0,
        }
    }
}

pub struct Ghost {
    pub id: String,
    pub body: RigidBodyHandle,
    pub shape: GhostShape,
    pub mass: f32,
    pub color: [f32; 3],
    pub position: Vector<Real>,
    pub rotation: UnitQuaternion<Real>,
    pub velocity: Vector<Real>,
    pub carrier: Option<String>,
}

pub struct Projectile {
    pub id: String,
    pub owner: String,
    pub body: RigidBodyHandle,
    pub created_at: f64,
    pub position: Vector<Real>,
    pub velocity: Vector<Real>,
}

pub struct LevelObject {
    pub body: RigidBodyHandle,
    pub position: Vector<Real>,
    pub size: Vector<Real>,    // full extents
    pub color: [f32; 3],
}

pub struct GameState {
    pub tick: u64,
    pub started: Instant,
    pub clients: HashMap<String, ClientTx>,
    pub players: HashMap<String, Player>,
    pub vehicles: HashMap<String, Vehicle>,
    pub ghosts: HashMap<String, Ghost>,
    pub projectiles: HashMap<String, Projectile>,
    pub level: Vec<LevelObject>,
    next_vehicle_id: u64,
    next_ghost_id: u64,
    next_projectile_id: u64,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            tick: 0,
            started: Instant::now(),
            clients: HashMap::new(),
            players: HashMap::new(),
            vehicles: HashMap::new(),
            ghosts: HashMap::new(),
            projectiles: HashMap::new(),
            level: Vec::new(),
            next_vehicle_id: 0,
            next_ghost_id: 0,
            next_projectile_id: 0,
        }
    }

    /// Wall-clock seconds since server start; drives cooldowns and TTLs.
    pub fn now(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    // ===========================================================================
    // Id generation
    // ===========================================================================

    /// Short random base-36 id, retried on the unlikely collision.
    pub fn new_player_id(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        let mut rng = rand::thread_rng();
        loop {
            let id: String = (0..6)
                .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
                .collect();
            if !self.clients.contains_key(&id) && !self.players.contains_key(&id) {
                return id;
            }
        }
    }

    pub fn new_vehicle_id(&mut self) -> String {
        let id = format!("vehicle_{}", self.next_vehicle_id);
        self.next_vehicle_id += 1;
        id
    }

    pub fn new_ghost_id(&mut self) -> String {
        let id = format!("ghost_{}", self.next_ghost_id);
        self.next_ghost_id += 1;
        id
    }

    pub fn new_projectile_id(&mut self) -> String {
        let id = format!("proj_{}", self.next_projectile_id);
        self.next_projectile_id += 1;
        id
    }

    // ===========================================================================
    // Client fan-out
    // ===========================================================================

    pub fn register_client(&mut self, id: String, tx: ClientTx) {
        self.clients.insert(id, tx);
    }

    pub fn remove_client(&mut self, id: &str) {
        self.clients.remove(id);
    }

    /// Serialize once, send to every connected client. Closed sinks are
    /// skipped silently; the disconnect path cleans them up.
    pub fn broadcast(&self, msg: &ServerMessage) {
        let json = match serde_json::to_string(msg) {
            Ok(json) => json,
            Err(err) => {
                warn!("failed to serialize broadcast: {err}");
                return;
            }
        };
        for tx in self.clients.values() {
            let _ = tx.send(json.clone());
        }
    }

    pub fn send_to(&self, id: &str, msg: &ServerMessage) {
        let Some(tx) = self.clients.get(id) else { return };
        match serde_json::to_string(msg) {
            Ok(json) => {
                let _ = tx.send(json);
            }
            Err(err) => warn!("failed to serialize message for {id}: {err}"),
        }
    }

    // ===========================================================================
    // Snapshots
    // ===========================================================================

    pub fn player_snapshot(&self, player: &Player) -> PlayerSnapshot {
        PlayerSnapshot {
            id: player.id.clone(),
            position: player.position.into(),
            rotation: player.rotation.into(),
            velocity: player.velocity.into(),
            health: player.health,
            look_direction: player.look_dir.into(),
            vehicle: match &player.context {
                ControlContext::Driving { vehicle } => Some(vehicle.clone()),
                ControlContext::OnFoot => None,
            },
            carrying: player.carrying.clone(),
        }
    }

    pub fn vehicle_snapshot(&self, vehicle: &Vehicle) -> VehicleSnapshot {
        VehicleSnapshot {
            id: vehicle.id.clone(),
            kind: vehicle.kind.as_str(),
            position: vehicle.position.into(),
            rotation: vehicle.rotation.into(),
            velocity: vehicle.velocity.into(),
            driver: vehicle.driver.clone(),
            engine_on: vehicle.engine_on,
            throttle: vehicle.throttle,
        }
    }

    pub fn ghost_snapshot(&self, ghost: &Ghost) -> GhostSnapshot {
        GhostSnapshot {
            id: ghost.id.clone(),
            shape: ghost.shape.snapshot(),
            mass: ghost.mass,
            position: ghost.position.into(),
            rotation: ghost.rotation.into(),
            velocity: ghost.velocity.into(),
            color: ghost.color,
            carrier: ghost.carrier.clone(),
        }
    }

    pub fn projectile_snapshot(&self, projectile: &Projectile) -> ProjectileSnapshot {
        ProjectileSnapshot {
            id: projectile.id.clone(),
            position: projectile.position.into(),
            velocity: projectile.velocity.into(),
            owner: projectile.owner.clone(),
        }
    }

    pub fn level_snapshot(&self) -> Vec<LevelObjectSnapshot> {
        self.level
            .iter()
            .map(|obj| LevelObjectSnapshot {
                position: obj.position.into(),
                size: obj.size.into(),
                color: obj.color,
            })
            .collect()
    }

    pub fn world_snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick,
            players: self.players.values().map(|p| self.player_snapshot(p)).collect(),
            projectiles: self
                .projectiles
                .values()
                .map(|p| self.projectile_snapshot(p))
                .collect(),
            vehicles: self.vehicles.values().map(|v| self.vehicle_snapshot(v)).collect(),
            ghosts: self.ghosts.values().map(|g| self.ghost_snapshot(g)).collect(),
        }
    }
}
