//! Local player prediction: per-frame physics with soft server reconciliation
//!
//! Every blend uses the exponential form `1 - e^(-k*dt)` so convergence speed
//! is independent of frame rate. A fixed per-frame fraction would make
//! movement feel different at 30 and 144 fps; do not replace it.

use std::f32::consts::PI;

use crate::store::EntityStore;

/// Velocity blend rate toward the intent-derived target (per second)
pub const MOVE_ACCEL: f32 = 18.0;

/// Soft pull rate toward the last known server position (per second)
pub const RECONCILE_SPEED: f32 = 6.0;

/// Facing blend rate (per second)
pub const TURN_SPEED: f32 = 10.0;

/// Below this speed the facing angle holds its last value
const MIN_FACING_SPEED: f32 = 1e-2;

/// Frame-rate-independent blend fraction for rate constant `k`
#[inline]
pub fn exp_blend(k: f32, dt: f32) -> f32 {
    1.0 - (-k * dt).exp()
}

/// Advance the local player one frame.
///
/// `intent` comes from the intent producer with magnitude <= 1 (re-clamped
/// here defensively). Sub-steps with missing inputs (no map yet) are skipped,
/// never an error.
pub fn step_local_player(store: &mut EntityStore, intent: (f32, f32), dt: f32, now_ms: u64) {
    store.player.expire_buffs(now_ms);

    let intent = if store.player.can_move(now_ms) {
        clamp_intent(intent)
    } else {
        (0.0, 0.0)
    };

    let speed = store.player.effective_speed(now_ms);
    let target_vx = intent.0 * speed;
    let target_vy = intent.1 * speed;

    let p = &mut store.player;

    // Velocity blend, then Euler integration
    let accel = exp_blend(MOVE_ACCEL, dt);
    p.vx += (target_vx - p.vx) * accel;
    p.vy += (target_vy - p.vy) * accel;
    p.x += p.vx * dt;
    p.y += p.vy * dt;

    // Continuous soft correction toward the server's view. Hard snaps on
    // large divergence happen at snapshot ingestion, not here.
    if let (Some(sx), Some(sy)) = (p.server_x, p.server_y) {
        let pull = exp_blend(RECONCILE_SPEED, dt);
        p.x += (sx - p.x) * pull;
        p.y += (sy - p.y) * pull;
    }

    // Facing follows the motion direction over the shortest arc
    let moving_speed = (p.vx * p.vx + p.vy * p.vy).sqrt();
    if moving_speed > MIN_FACING_SPEED {
        let desired = p.vy.atan2(p.vx);
        let diff = wrap_angle(desired - p.facing);
        p.facing = wrap_angle(p.facing + diff * exp_blend(TURN_SPEED, dt));
    }

    // Keep the predicted position legal: boundary first, then walls
    if let Some(map) = &store.map {
        let (cx, cy) = map.clamp_to_bounds(p.x, p.y, p.radius);
        p.x = cx;
        p.y = cy;

        if let Some(((wx, wy), (nx, ny))) = map.resolve_walls(p.x, p.y, p.radius) {
            p.x = wx;
            p.y = wy;
            // Cancel the velocity component driving into the wall
            let vn = p.vx * nx + p.vy * ny;
            if vn < 0.0 {
                p.vx -= nx * vn;
                p.vy -= ny * vn;
            }
        }
    }
}

fn clamp_intent((ix, iy): (f32, f32)) -> (f32, f32) {
    let mag_sq = ix * ix + iy * iy;
    if mag_sq > 1.0 {
        let mag = mag_sq.sqrt();
        (ix / mag, iy / mag)
    } else {
        (ix, iy)
    }
}

/// Wrap an angle to [-pi, pi]
pub fn wrap_angle(a: f32) -> f32 {
    let mut a = a % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EntityStore, GameMap, MapShape, PlayerClass, Wall};

    fn store_with_map(shape: MapShape) -> EntityStore {
        let mut store = EntityStore::new("Ada".to_string(), PlayerClass::Warrior);
        store.set_map(GameMap::new(shape, 0.0, 0.0));
        store
    }

    fn run(store: &mut EntityStore, intent: (f32, f32), dt: f32, total: f32) {
        let mut t = 0.0;
        while t < total - 1e-6 {
            step_local_player(store, intent, dt, 0);
            t += dt;
        }
    }

    #[test]
    fn convergence_is_frame_rate_independent() {
        let total = 2.0;
        let mut at_30 = store_with_map(MapShape::Circle { radius: 10_000.0 });
        let mut at_120 = store_with_map(MapShape::Circle { radius: 10_000.0 });

        run(&mut at_30, (1.0, 0.0), 1.0 / 30.0, total);
        run(&mut at_120, (1.0, 0.0), 1.0 / 120.0, total);

        let travelled = at_120.player.x.max(1.0);
        let diff = (at_30.player.x - at_120.player.x).abs();
        assert!(
            diff / travelled < 0.01,
            "positions diverged by {diff} over {travelled}"
        );
    }

    #[test]
    fn soft_reconciliation_pulls_toward_server() {
        let mut store = store_with_map(MapShape::Circle { radius: 10_000.0 });
        store.player.x = 100.0;
        store.player.server_x = Some(0.0);
        store.player.server_y = Some(0.0);

        let before = store.player.x;
        step_local_player(&mut store, (0.0, 0.0), 1.0 / 60.0, 0);
        assert!(store.player.x < before);
        // Soft pull, not a snap
        assert!(store.player.x > 50.0);

        run(&mut store, (0.0, 0.0), 1.0 / 60.0, 3.0);
        assert!(store.player.x.abs() < 1.0);
    }

    #[test]
    fn dead_player_ignores_intent() {
        let mut store = store_with_map(MapShape::Circle { radius: 1_000.0 });
        store.player.mark_dead();
        run(&mut store, (1.0, 0.0), 1.0 / 60.0, 1.0);
        assert_eq!(store.player.x, 0.0);
    }

    #[test]
    fn stunned_player_ignores_intent() {
        let mut store = store_with_map(MapShape::Circle { radius: 1_000.0 });
        store.player.stunned_until_ms = 10_000;
        step_local_player(&mut store, (1.0, 0.0), 1.0 / 60.0, 5_000);
        assert_eq!(store.player.vx, 0.0);
    }

    #[test]
    fn oversized_intent_is_normalized() {
        let mut a = store_with_map(MapShape::Circle { radius: 10_000.0 });
        let mut b = store_with_map(MapShape::Circle { radius: 10_000.0 });
        run(&mut a, (3.0, 0.0), 1.0 / 60.0, 1.0);
        run(&mut b, (1.0, 0.0), 1.0 / 60.0, 1.0);
        assert!((a.player.x - b.player.x).abs() < 1e-3);
    }

    #[test]
    fn position_stays_inside_circle_bounds() {
        let mut store = store_with_map(MapShape::Circle { radius: 200.0 });
        run(&mut store, (1.0, 0.3), 1.0 / 60.0, 5.0);
        let p = &store.player;
        let dist = (p.x * p.x + p.y * p.y).sqrt();
        assert!(dist <= 200.0 - p.radius + 1e-3, "escaped bounds: {dist}");
    }

    #[test]
    fn position_stays_inside_square_bounds() {
        let mut store = store_with_map(MapShape::Square { half: 150.0 });
        run(&mut store, (-1.0, -1.0), 1.0 / 60.0, 5.0);
        let p = &store.player;
        assert!(p.x.abs() <= 150.0 - p.radius + 1e-3);
        assert!(p.y.abs() <= 150.0 - p.radius + 1e-3);
    }

    #[test]
    fn walls_block_movement_and_zero_velocity_into_them() {
        let mut store = store_with_map(MapShape::Square { half: 1_000.0 });
        store
            .map
            .as_mut()
            .unwrap()
            .set_walls(vec![Wall::Rect {
                x: 100.0,
                y: -500.0,
                w: 50.0,
                h: 1_000.0,
            }]);

        run(&mut store, (1.0, 0.0), 1.0 / 60.0, 5.0);
        let p = &store.player;
        assert!(p.x <= 100.0 - p.radius + 1e-2, "pushed into wall: {}", p.x);
        assert!(p.vx.abs() < 1e-2, "velocity into wall not cancelled");
    }

    #[test]
    fn missing_map_skips_clamp_without_error() {
        let mut store = EntityStore::new("Ada".to_string(), PlayerClass::Warrior);
        run(&mut store, (1.0, 0.0), 1.0 / 60.0, 1.0);
        assert!(store.player.x > 0.0);
    }

    #[test]
    fn facing_turns_toward_motion() {
        let mut store = store_with_map(MapShape::Circle { radius: 10_000.0 });
        run(&mut store, (0.0, 1.0), 1.0 / 60.0, 2.0);
        assert!((store.player.facing - std::f32::consts::FRAC_PI_2).abs() < 0.05);
    }

    #[test]
    fn wrap_angle_takes_shortest_arc() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-5);
        assert!((wrap_angle(-3.0 * PI) + PI).abs() < 1e-5);
        assert_eq!(wrap_angle(0.5), 0.5);
    }
}
