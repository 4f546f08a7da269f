//! Remote entity interpolation and mob fades
//!
//! Snapshots arrive a few times per second; each frame the display position of
//! every remote entity is blended toward its latest authoritative target so
//! motion stays smooth between updates.

use crate::sim::predict::exp_blend;
use crate::store::RemoteWorld;

/// Display-position blend rate for remote players and mobs (per second)
pub const REMOTE_INTERP_SPEED: f32 = 8.0;

/// Projectiles track faster; they are short-lived and fast-moving
pub const PROJECTILE_INTERP_SPEED: f32 = 14.0;

/// Mob alpha ramp rate, per second (fade-in alive, fade-out dead)
pub const MOB_FADE_RATE: f32 = 2.5;

/// Advance every remote entity one frame and sweep out fully-faded mobs
pub fn step_remote_entities(world: &mut RemoteWorld, dt: f32) {
    let blend = exp_blend(REMOTE_INTERP_SPEED, dt);
    let projectile_blend = exp_blend(PROJECTILE_INTERP_SPEED, dt);

    for p in world.players.values_mut() {
        p.x += (p.tx - p.x) * blend;
        p.y += (p.ty - p.y) * blend;
    }

    for m in world.mobs.values_mut() {
        m.x += (m.tx - m.x) * blend;
        m.y += (m.ty - m.y) * blend;
        if m.dead {
            m.alpha = (m.alpha - MOB_FADE_RATE * dt).max(0.0);
        } else {
            m.alpha = (m.alpha + MOB_FADE_RATE * dt).min(1.0);
        }
    }

    for b in world.projectiles.values_mut() {
        b.x += (b.tx - b.x) * projectile_blend;
        b.y += (b.ty - b.y) * projectile_blend;
    }

    world.remove_faded_mobs();
}
