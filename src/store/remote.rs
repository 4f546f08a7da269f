//! Mirrored server entities: remote players, mobs, and projectiles
//!
//! Each record carries two positions: the target (latest authoritative value
//! from a snapshot) and the display position the renderer reads, which the
//! interpolation pass blends toward the target every frame.

use std::collections::{HashMap, HashSet};

/// Alpha below which a dead mob is considered fully faded and removable
pub const MOB_REMOVE_ALPHA: f32 = 0.001;

/// A remote player mirrored from snapshots
#[derive(Debug, Clone)]
pub struct RemotePlayer {
    pub name: String,
    pub color: String,
    pub level: u32,
    pub kills: u32,
    pub hp: f32,
    pub max_hp: f32,
    pub radius: f32,
    /// Interpolated position the renderer reads
    pub x: f32,
    pub y: f32,
    /// Latest authoritative position
    pub tx: f32,
    pub ty: f32,
    pub stunned_until_ms: u64,
}

/// A mob mirrored from snapshots; fades in on spawn and out on death
#[derive(Debug, Clone)]
pub struct RemoteMob {
    pub kind: String,
    pub hp: f32,
    pub max_hp: f32,
    pub radius: f32,
    pub x: f32,
    pub y: f32,
    pub tx: f32,
    pub ty: f32,
    /// Render opacity, 0..1
    pub alpha: f32,
    pub dead: bool,
    pub stunned_until_ms: u64,
}

/// A projectile mirrored from snapshots
#[derive(Debug, Clone)]
pub struct RemoteProjectile {
    pub kind: String,
    pub owner_id: String,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub x: f32,
    pub y: f32,
    pub tx: f32,
    pub ty: f32,
    pub alpha: f32,
}

/// Snapshot fields for a remote player
#[derive(Debug, Clone)]
pub struct PlayerPatch {
    pub name: String,
    pub color: String,
    pub level: u32,
    pub kills: u32,
    pub hp: f32,
    pub max_hp: f32,
    pub radius: f32,
    pub x: f32,
    pub y: f32,
}

/// Snapshot fields for a mob
#[derive(Debug, Clone)]
pub struct MobPatch {
    pub kind: String,
    pub hp: f32,
    pub max_hp: f32,
    pub radius: f32,
    pub x: f32,
    pub y: f32,
}

/// Snapshot fields for a projectile
#[derive(Debug, Clone)]
pub struct ProjectilePatch {
    pub kind: String,
    pub owner_id: String,
    pub vx: f32,
    pub vy: f32,
    pub radius: f32,
    pub x: f32,
    pub y: f32,
}

/// The three remote-entity maps, keyed by server-assigned id
#[derive(Debug, Default)]
pub struct RemoteWorld {
    pub players: HashMap<String, RemotePlayer>,
    pub mobs: HashMap<String, RemoteMob>,
    pub projectiles: HashMap<String, RemoteProjectile>,
}

impl RemoteWorld {
    /// Insert or update a remote player. New entries snap display to target;
    /// existing entries only move their target.
    pub fn upsert_player(&mut self, id: &str, patch: PlayerPatch) {
        match self.players.get_mut(id) {
            Some(p) => {
                p.name = patch.name;
                p.color = patch.color;
                p.level = patch.level;
                p.kills = patch.kills;
                p.hp = patch.hp;
                p.max_hp = patch.max_hp;
                p.radius = patch.radius;
                p.tx = patch.x;
                p.ty = patch.y;
            }
            None => {
                self.players.insert(
                    id.to_string(),
                    RemotePlayer {
                        name: patch.name,
                        color: patch.color,
                        level: patch.level,
                        kills: patch.kills,
                        hp: patch.hp,
                        max_hp: patch.max_hp,
                        radius: patch.radius,
                        x: patch.x,
                        y: patch.y,
                        tx: patch.x,
                        ty: patch.y,
                        stunned_until_ms: 0,
                    },
                );
            }
        }
    }

    /// Drop every remote player whose id is not in the latest snapshot
    pub fn remove_absent_players(&mut self, seen: &HashSet<String>) {
        self.players.retain(|id, _| seen.contains(id));
    }

    /// Insert or update a mob, returning its previous hp so the caller can
    /// emit damage numbers on decrease.
    pub fn upsert_mob(&mut self, id: &str, patch: MobPatch) -> Option<f32> {
        match self.mobs.get_mut(id) {
            Some(m) => {
                let prev_hp = m.hp;
                m.kind = patch.kind;
                m.hp = patch.hp;
                m.max_hp = patch.max_hp;
                m.radius = patch.radius;
                m.tx = patch.x;
                m.ty = patch.y;
                m.dead = false;
                Some(prev_hp)
            }
            None => {
                self.mobs.insert(
                    id.to_string(),
                    RemoteMob {
                        kind: patch.kind,
                        hp: patch.hp,
                        max_hp: patch.max_hp,
                        radius: patch.radius,
                        x: patch.x,
                        y: patch.y,
                        tx: patch.x,
                        ty: patch.y,
                        // Spawn at zero alpha and fade in
                        alpha: 0.0,
                        dead: false,
                        stunned_until_ms: 0,
                    },
                );
                None
            }
        }
    }

    /// Mobs absent from a snapshot are marked dead rather than removed so the
    /// fade-out can play; removal happens in `remove_faded_mobs`.
    pub fn mark_absent_mobs_dead(&mut self, seen: &HashSet<String>) {
        for (id, mob) in self.mobs.iter_mut() {
            if !seen.contains(id) {
                mob.dead = true;
                mob.hp = 0.0;
            }
        }
    }

    /// Mark a single mob dead immediately (mob_died pre-empts the snapshot)
    pub fn mark_mob_dead(&mut self, id: &str) -> bool {
        match self.mobs.get_mut(id) {
            Some(mob) => {
                mob.dead = true;
                mob.hp = 0.0;
                true
            }
            None => false,
        }
    }

    /// Remove dead mobs whose fade-out has completed
    pub fn remove_faded_mobs(&mut self) {
        self.mobs
            .retain(|_, m| !(m.dead && m.alpha <= MOB_REMOVE_ALPHA));
    }

    /// Insert or update a projectile
    pub fn upsert_projectile(&mut self, id: &str, patch: ProjectilePatch) {
        match self.projectiles.get_mut(id) {
            Some(p) => {
                p.kind = patch.kind;
                p.owner_id = patch.owner_id;
                p.vx = patch.vx;
                p.vy = patch.vy;
                p.radius = patch.radius;
                p.tx = patch.x;
                p.ty = patch.y;
            }
            None => {
                self.projectiles.insert(
                    id.to_string(),
                    RemoteProjectile {
                        kind: patch.kind,
                        owner_id: patch.owner_id,
                        vx: patch.vx,
                        vy: patch.vy,
                        radius: patch.radius,
                        x: patch.x,
                        y: patch.y,
                        tx: patch.x,
                        ty: patch.y,
                        alpha: 1.0,
                    },
                );
            }
        }
    }

    /// Projectiles absent from a snapshot are deleted immediately (no fade)
    pub fn retain_projectiles(&mut self, seen: &HashSet<String>) {
        self.projectiles.retain(|id, _| seen.contains(id));
    }

    /// Set the stun deadline on a remote player or mob
    pub fn stun_entity(&mut self, id: &str, until_ms: u64) -> bool {
        if let Some(p) = self.players.get_mut(id) {
            p.stunned_until_ms = until_ms;
            return true;
        }
        if let Some(m) = self.mobs.get_mut(id) {
            m.stunned_until_ms = until_ms;
            return true;
        }
        false
    }
}
