//! Message dispatcher: applies one inbound message to the entity store
//!
//! A pure mapping from (store, session, message) to mutations plus a list of
//! presentation requests. Handlers are synchronous and complete before the
//! next message is processed; messages apply strictly in arrival order.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::store::map::{GameMap, MapShape};
use crate::store::player::LocalBuff;
use crate::store::remote::{MobPatch, PlayerPatch, ProjectilePatch};
use crate::store::EntityStore;
use crate::store::effects::{CastVisual, CastVisualKind};

use super::protocol::{
    CastEffectMsg, MapParams, MatchStartMsg, PlayerSnap, ServerMsg, SnapshotMsg, WelcomeMsg,
};
use super::{GamePhase, SessionState};

/// Divergence beyond which a snapshot hard-snaps the predicted position.
/// Below this, drift is treated as jitter and corrected softly per frame.
pub const HARD_SNAP_DIST: f32 = 140.0;

/// Cast rejection reason that triggers the optimistic-state rollback
const REASON_NO_TARGET: &str = "no_target";

/// Presentation requests produced by a dispatch, drained by the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    /// First snapshot arrived: hide loading UI, enable chat, show inventory
    LoadingFinished,
    /// Match started: begin the periodic input-send timer
    GameplayStarted,
    /// The local player died: show the death overlay
    ShowDeathOverlay,
}

/// Apply one inbound message to the store and session
pub fn dispatch(
    store: &mut EntityStore,
    session: &mut SessionState,
    msg: ServerMsg,
    now_ms: u64,
) -> Vec<SideEffect> {
    let mut out = Vec::new();
    match msg {
        ServerMsg::Welcome(w) => apply_welcome(store, session, w),
        ServerMsg::QueueUpdate { position, size } => {
            session.phase = GamePhase::Queued;
            session.queue_position = Some((position, size));
        }
        ServerMsg::MatchCreated { match_id } => {
            debug!(match_id = %match_id, "Match created");
            session.match_id = Some(match_id);
        }
        ServerMsg::MatchCountdown { seconds } => {
            session.phase = GamePhase::Countdown;
            session.countdown_until_ms = Some(now_ms + (seconds.max(0.0) * 1000.0) as u64);
        }
        ServerMsg::MatchStart(m) => {
            apply_match_start(store, session, m);
            out.push(SideEffect::GameplayStarted);
        }
        ServerMsg::Snapshot(s) => apply_snapshot(store, session, s, now_ms, &mut out),
        ServerMsg::Chat {
            from,
            text,
            chat_id,
        } => {
            // A matching pending echo is confirmed in place; anything else is
            // a line from someone else (or an echo we lost track of).
            if !store.effects.confirm_chat(chat_id) {
                store.effects.push_chat(&from, &text);
            }
        }
        ServerMsg::ChatBlocked { reason, chat_id } => {
            store.effects.reject_chat(chat_id, &reason);
        }
        ServerMsg::PlayerLevelup { id, name, level } => {
            let who = if store.is_self(&id) {
                store.player.name.clone()
            } else {
                name
            };
            store
                .effects
                .push_system(&format!("{who} reached level {level}!"));
        }
        ServerMsg::MobDied { mob_id, killer_id, xp } => {
            if !store.remote.mark_mob_dead(&mob_id) {
                debug!(mob_id = %mob_id, "mob_died for unknown mob");
            }
            if killer_id.as_deref().is_some_and(|k| store.is_self(k)) && xp > 0 {
                // Optimistic XP; the next snapshot remains authoritative
                store.player.xp += xp;
                let (px, py) = (store.player.x, store.player.y);
                store
                    .effects
                    .push_text(format!("+{xp} XP"), px, py, "#ffd700", now_ms);
            }
        }
        ServerMsg::CastEffect(e) => apply_cast_effect(store, e, now_ms),
        ServerMsg::Stun { target_id, until } => {
            if store.is_self(&target_id) {
                store.player.stunned_until_ms = until;
            } else if !store.remote.stun_entity(&target_id, until) {
                debug!(target_id = %target_id, "stun for unknown entity");
            }
        }
        ServerMsg::PlayerHurt { id, damage, hp } => {
            if store.is_self(&id) {
                store.player.set_hp(hp);
                let (px, py) = (store.player.x, store.player.y);
                store
                    .effects
                    .push_text(format!("-{}", damage.round()), px, py, "#ff4040", now_ms);
            } else if let Some(p) = store.remote.players.get_mut(&id) {
                p.hp = hp.clamp(0.0, p.max_hp);
                let (px, py) = (p.x, p.y);
                store
                    .effects
                    .push_text(format!("-{}", damage.round()), px, py, "#ff4040", now_ms);
            }
        }
        ServerMsg::PlayerHealed { id, amount, hp } => {
            if store.is_self(&id) {
                store.player.set_hp(hp);
                let (px, py) = (store.player.x, store.player.y);
                store
                    .effects
                    .push_text(format!("+{}", amount.round()), px, py, "#40ff40", now_ms);
            } else if let Some(p) = store.remote.players.get_mut(&id) {
                p.hp = hp.clamp(0.0, p.max_hp);
                let (px, py) = (p.x, p.y);
                store
                    .effects
                    .push_text(format!("+{}", amount.round()), px, py, "#40ff40", now_ms);
            }
        }
        ServerMsg::CastRejected { slot, reason } => {
            warn!(slot, reason = %reason, "Cast rejected by server");
            store.effects.set_status(&format!("Cast failed: {reason}"));
            if reason == REASON_NO_TARGET {
                let (px, py) = (store.player.x, store.player.y);
                store.effects.rollback_cast(slot, px, py, now_ms);
            }
        }
        ServerMsg::PlayerDied { id, killer_id } => {
            if store.is_self(&id) {
                store.player.mark_dead();
                out.push(SideEffect::ShowDeathOverlay);
            } else if let Some(p) = store.remote.players.get_mut(&id) {
                p.hp = 0.0;
            }
            // Kill credit (kills counter, XP) arrives via the next snapshot
            let _ = killer_id;
        }
    }
    out
}

fn apply_welcome(store: &mut EntityStore, session: &mut SessionState, w: WelcomeMsg) {
    store.player.id = Some(w.id);
    if let Some(class) = w.class {
        store.player.class = class;
    }
    store.player.level = w.level;
    store.player.xp = w.xp;
    if let Some(next) = w.next_level_xp {
        store.player.next_level_xp = next;
    }
    if let Some(max_hp) = w.max_hp {
        store.player.set_base_max_hp(max_hp);
        store.player.set_hp(max_hp);
    }
    if let Some(map) = map_from_params(&w.map) {
        store.set_map(map);
    }
    session.welcome_received = true;
}

fn apply_match_start(store: &mut EntityStore, session: &mut SessionState, m: MatchStartMsg) {
    if m.match_id.is_some() {
        session.match_id = m.match_id;
    }
    if let Some(map) = map_from_params(&m.map) {
        store.set_map(map);
    }
    if let Some(max_hp) = m.max_hp {
        store.player.set_base_max_hp(max_hp);
        store.player.set_hp(max_hp);
    }
    if let (Some(x), Some(y)) = (m.spawn_x, m.spawn_y) {
        store.player.respawn(x, y);
    }
    session.phase = GamePhase::Playing;
    session.countdown_until_ms = None;
}

/// Build client map geometry from wire parameters; None when the payload
/// carries no usable shape (keep whatever map we already have).
fn map_from_params(params: &MapParams) -> Option<GameMap> {
    let shape = match params.map_type.as_deref() {
        Some("square") => MapShape::Square {
            half: params.map_half?,
        },
        Some("circle") => MapShape::Circle {
            radius: params.map_radius?,
        },
        // Legacy payloads omit mapType and always mean a circle
        None => MapShape::Circle {
            radius: params.map_radius?,
        },
        Some(other) => {
            warn!(map_type = %other, "Unknown map type, keeping current map");
            return None;
        }
    };
    let mut map = GameMap::new(shape, params.center_x, params.center_y);
    if let Some(walls) = &params.walls {
        map.set_walls(walls.clone());
    }
    Some(map)
}

fn apply_snapshot(
    store: &mut EntityStore,
    session: &mut SessionState,
    snap: SnapshotMsg,
    now_ms: u64,
    out: &mut Vec<SideEffect>,
) {
    let mut seen_players: HashSet<String> = HashSet::with_capacity(snap.players.len());
    for entry in snap.players {
        if store.is_self(&entry.id) {
            apply_self_snapshot(store, session, entry, now_ms);
        } else {
            seen_players.insert(entry.id.clone());
            store.remote.upsert_player(
                &entry.id,
                PlayerPatch {
                    name: entry.name,
                    color: entry.color,
                    level: entry.level,
                    kills: entry.kills,
                    hp: entry.hp,
                    max_hp: entry.max_hp,
                    radius: entry.radius,
                    x: entry.x,
                    y: entry.y,
                },
            );
        }
    }
    store.remote.remove_absent_players(&seen_players);

    let mut seen_mobs: HashSet<String> = HashSet::with_capacity(snap.mobs.len());
    for entry in snap.mobs {
        seen_mobs.insert(entry.id.clone());
        let (mx, my) = (entry.x, entry.y);
        let hp = entry.hp;
        let prev_hp = store.remote.upsert_mob(
            &entry.id,
            MobPatch {
                kind: entry.kind,
                hp: entry.hp,
                max_hp: entry.max_hp,
                radius: entry.radius,
                x: entry.x,
                y: entry.y,
            },
        );
        if let Some(prev) = prev_hp {
            if hp < prev {
                store
                    .effects
                    .push_text(format!("-{}", (prev - hp).round()), mx, my, "#ff4040", now_ms);
            }
        }
    }
    store.remote.mark_absent_mobs_dead(&seen_mobs);

    let mut seen_projectiles: HashSet<String> = HashSet::with_capacity(snap.projectiles.len());
    for entry in snap.projectiles {
        seen_projectiles.insert(entry.id.clone());
        store.remote.upsert_projectile(
            &entry.id,
            ProjectilePatch {
                kind: entry.kind,
                owner_id: entry.owner_id,
                vx: entry.vx,
                vy: entry.vy,
                radius: entry.radius,
                x: entry.x,
                y: entry.y,
            },
        );
    }
    store.remote.retain_projectiles(&seen_projectiles);

    if let (Some(walls), Some(map)) = (snap.walls, store.map.as_mut()) {
        map.set_walls(walls);
    }

    if !session.first_snapshot_received {
        session.first_snapshot_received = true;
        session.loading = false;
        out.push(SideEffect::LoadingFinished);
    }
}

fn apply_self_snapshot(
    store: &mut EntityStore,
    session: &mut SessionState,
    entry: PlayerSnap,
    now_ms: u64,
) {
    let prev_hp = store.player.hp;
    let p = &mut store.player;

    p.server_x = Some(entry.x);
    p.server_y = Some(entry.y);

    let dx = entry.x - p.x;
    let dy = entry.y - p.y;
    let diverged = dx * dx + dy * dy > HARD_SNAP_DIST * HARD_SNAP_DIST;
    if !session.first_snapshot_received || diverged {
        if diverged {
            debug!(dist = (dx * dx + dy * dy).sqrt(), "Hard snap to server position");
        }
        p.x = entry.x;
        p.y = entry.y;
    }

    // Server-authoritative stat overwrite
    p.level = entry.level;
    if let Some(xp) = entry.xp {
        p.xp = xp;
    }
    if let Some(next) = entry.next_level_xp {
        p.next_level_xp = next;
    }
    p.color = entry.color;
    store.player.set_base_max_hp(entry.max_hp);
    if store.player.awaiting_respawn && entry.hp > 0.0 {
        store.player.respawn(entry.x, entry.y);
    } else if !store.player.awaiting_respawn {
        store.player.radius = entry.radius;
    }
    store.player.set_hp(entry.hp);

    let hp = store.player.hp;
    let (px, py) = (store.player.x, store.player.y);
    if hp < prev_hp {
        store
            .effects
            .push_text(format!("-{}", (prev_hp - hp).round()), px, py, "#ff4040", now_ms);
    } else if hp > prev_hp {
        store
            .effects
            .push_text(format!("+{}", (hp - prev_hp).round()), px, py, "#40ff40", now_ms);
    }
}

fn apply_cast_effect(store: &mut EntityStore, e: CastEffectMsg, now_ms: u64) {
    let kind = match e.shape.as_deref() {
        Some("melee") => CastVisualKind::MeleeArc,
        _ => CastVisualKind::AreaRing,
    };
    store.effects.push_visual(CastVisual {
        skill: e.skill,
        kind,
        x: e.x,
        y: e.y,
        radius: e.radius,
        color: e.color,
        created_ms: now_ms,
        optimistic: false,
        slot: None,
    });

    if let Some(buff) = e.buff {
        if store.is_self(&buff.target_id) {
            // Optimistic: snapshots do not echo buffs, so no later
            // authoritative message contradicts this.
            store.player.add_buff(LocalBuff {
                kind: buff.kind,
                multiplier: buff.multiplier,
                until_ms: now_ms + buff.duration_ms,
            });
        }
    }
}
