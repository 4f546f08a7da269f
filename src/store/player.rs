//! Local player record - server-authoritative stats, locally-predicted motion

use serde::{Deserialize, Serialize};

/// Player classes available in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerClass {
    /// Melee, high hp
    Warrior,
    /// Ranged, fast
    Ranger,
    /// Area casts, fragile
    Mage,
}

impl Default for PlayerClass {
    fn default() -> Self {
        Self::Warrior
    }
}

impl PlayerClass {
    /// Parse a class name from config/UI input, defaulting to warrior
    pub fn parse(raw: &str) -> Self {
        match raw {
            "ranger" => Self::Ranger,
            "mage" => Self::Mage,
            _ => Self::Warrior,
        }
    }
}

/// Baseline stats per class, before server overrides and equipment bonuses
#[derive(Debug, Clone, Copy)]
pub struct ClassStats {
    /// Movement speed in world units per second
    pub base_speed: f32,
    /// Max hp at level 1 with no gear
    pub base_max_hp: f32,
    /// Collision/visual radius
    pub radius: f32,
}

impl ClassStats {
    pub fn for_class(class: PlayerClass) -> Self {
        match class {
            PlayerClass::Warrior => Self {
                base_speed: 170.0,
                base_max_hp: 240.0,
                radius: 22.0,
            },
            PlayerClass::Ranger => Self {
                base_speed: 200.0,
                base_max_hp: 180.0,
                radius: 20.0,
            },
            PlayerClass::Mage => Self {
                base_speed: 185.0,
                base_max_hp: 160.0,
                radius: 20.0,
            },
        }
    }
}

/// Kinds of time-bounded local buffs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuffKind {
    Speed,
    Damage,
    Shield,
}

/// A time-bounded buff applied locally (optimistically) on cast confirmation
#[derive(Debug, Clone, Copy)]
pub struct LocalBuff {
    pub kind: BuffKind,
    pub multiplier: f32,
    /// Expiry as Unix millis
    pub until_ms: u64,
}

/// Gear slots on the equipment panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GearSlot {
    Weapon,
    Armor,
    Trinket,
}

impl GearSlot {
    pub const ALL: [GearSlot; 3] = [GearSlot::Weapon, GearSlot::Armor, GearSlot::Trinket];

    fn index(self) -> usize {
        match self {
            GearSlot::Weapon => 0,
            GearSlot::Armor => 1,
            GearSlot::Trinket => 2,
        }
    }
}

/// An equippable item; only the hp bonus matters to client-side stats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GearItem {
    pub name: String,
    #[serde(default)]
    pub hp_bonus: f32,
}

/// The local player avatar.
///
/// Stats (hp, xp, level, max hp) are server-authoritative and overwritten by
/// snapshots; position and velocity are locally predicted and only softly
/// corrected toward the server's view.
#[derive(Debug, Clone)]
pub struct LocalPlayer {
    /// Server-assigned id, absent until the welcome message arrives
    pub id: Option<String>,
    pub name: String,
    pub class: PlayerClass,
    pub color: String,

    // Predicted motion
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Facing angle in radians
    pub facing: f32,
    pub radius: f32,

    // Server-authoritative stats
    pub level: u32,
    pub xp: u64,
    pub next_level_xp: u64,
    pub hp: f32,
    pub max_hp: f32,
    /// Max hp excluding equipment bonuses; bonuses re-apply additively on top
    pub base_max_hp: f32,

    // Status
    pub local_buffs: Vec<LocalBuff>,
    pub stunned_until_ms: u64,
    pub dead: bool,
    pub awaiting_respawn: bool,

    /// Latest authoritative position, for continuous reconciliation
    pub server_x: Option<f32>,
    pub server_y: Option<f32>,

    gear: [Option<GearItem>; 3],
}

impl LocalPlayer {
    pub fn new(name: String, class: PlayerClass) -> Self {
        let stats = ClassStats::for_class(class);
        Self {
            id: None,
            name,
            class,
            color: "#ffffff".to_string(),
            x: 0.0,
            y: 0.0,
            vx: 0.0,
            vy: 0.0,
            facing: 0.0,
            radius: stats.radius,
            level: 1,
            xp: 0,
            next_level_xp: 100,
            hp: stats.base_max_hp,
            max_hp: stats.base_max_hp,
            base_max_hp: stats.base_max_hp,
            local_buffs: Vec::new(),
            stunned_until_ms: 0,
            dead: false,
            awaiting_respawn: false,
            server_x: None,
            server_y: None,
            gear: [None, None, None],
        }
    }

    /// Movement speed with live speed buffs applied
    pub fn effective_speed(&self, now_ms: u64) -> f32 {
        let base = ClassStats::for_class(self.class).base_speed;
        self.local_buffs
            .iter()
            .filter(|b| b.kind == BuffKind::Speed && b.until_ms > now_ms)
            .fold(base, |speed, b| speed * b.multiplier)
    }

    /// Drop expired buffs. Safe to call any number of times per frame.
    pub fn expire_buffs(&mut self, now_ms: u64) {
        self.local_buffs.retain(|b| b.until_ms > now_ms);
    }

    pub fn add_buff(&mut self, buff: LocalBuff) {
        self.local_buffs.push(buff);
    }

    pub fn is_stunned(&self, now_ms: u64) -> bool {
        self.stunned_until_ms > now_ms
    }

    /// Whether movement intent should be honored this frame
    pub fn can_move(&self, now_ms: u64) -> bool {
        !self.dead && !self.awaiting_respawn && !self.is_stunned(now_ms)
    }

    /// Mark the player dead and hide the avatar until respawn
    pub fn mark_dead(&mut self) {
        self.dead = true;
        self.awaiting_respawn = true;
        self.hp = 0.0;
        self.vx = 0.0;
        self.vy = 0.0;
        // Zero radius hides the entity while waiting to respawn
        self.radius = 0.0;
    }

    /// Restore the avatar after the server respawns us
    pub fn respawn(&mut self, x: f32, y: f32) {
        self.dead = false;
        self.awaiting_respawn = false;
        self.radius = ClassStats::for_class(self.class).radius;
        self.x = x;
        self.y = y;
        self.server_x = Some(x);
        self.server_y = Some(y);
        self.hp = self.max_hp;
    }

    /// Overwrite hp from an authoritative source, clamped to [0, max_hp]
    pub fn set_hp(&mut self, hp: f32) {
        self.hp = hp.clamp(0.0, self.max_hp);
    }

    /// Equip an item into a gear slot, returning whatever it displaced.
    /// UI-owned mutation path; not touched by prediction or reconciliation.
    pub fn equip(&mut self, slot: GearSlot, item: GearItem) -> Option<GearItem> {
        let prev = self.gear[slot.index()].replace(item);
        self.recompute_max_hp();
        prev
    }

    /// Remove the item in a gear slot, if any
    pub fn unequip(&mut self, slot: GearSlot) -> Option<GearItem> {
        let prev = self.gear[slot.index()].take();
        self.recompute_max_hp();
        prev
    }

    pub fn gear_in(&self, slot: GearSlot) -> Option<&GearItem> {
        self.gear[slot.index()].as_ref()
    }

    /// Re-derive max hp as base plus the sum of equipment bonuses
    fn recompute_max_hp(&mut self) {
        let bonus: f32 = self
            .gear
            .iter()
            .flatten()
            .map(|item| item.hp_bonus)
            .sum();
        self.max_hp = self.base_max_hp + bonus;
        self.hp = self.hp.clamp(0.0, self.max_hp);
    }

    /// Apply an authoritative base-max-hp (e.g. from welcome/match_start),
    /// keeping equipment bonuses layered on top.
    pub fn set_base_max_hp(&mut self, base: f32) {
        self.base_max_hp = base;
        self.recompute_max_hp();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> LocalPlayer {
        LocalPlayer::new("Ada".to_string(), PlayerClass::Mage)
    }

    #[test]
    fn buff_expiry_is_idempotent() {
        let mut p = player();
        p.add_buff(LocalBuff {
            kind: BuffKind::Speed,
            multiplier: 1.5,
            until_ms: 1_000,
        });
        p.add_buff(LocalBuff {
            kind: BuffKind::Speed,
            multiplier: 1.2,
            until_ms: 5_000,
        });

        p.expire_buffs(2_000);
        let after_once: Vec<u64> = p.local_buffs.iter().map(|b| b.until_ms).collect();
        p.expire_buffs(2_000);
        let after_twice: Vec<u64> = p.local_buffs.iter().map(|b| b.until_ms).collect();

        assert_eq!(after_once, vec![5_000]);
        assert_eq!(after_once, after_twice);
    }

    #[test]
    fn speed_buffs_multiply_and_ignore_expired() {
        let mut p = player();
        let base = ClassStats::for_class(PlayerClass::Mage).base_speed;
        p.add_buff(LocalBuff {
            kind: BuffKind::Speed,
            multiplier: 2.0,
            until_ms: 10_000,
        });
        p.add_buff(LocalBuff {
            kind: BuffKind::Speed,
            multiplier: 3.0,
            until_ms: 100, // already expired at now=5000
        });
        p.add_buff(LocalBuff {
            kind: BuffKind::Damage,
            multiplier: 9.0,
            until_ms: 10_000,
        });
        assert!((p.effective_speed(5_000) - base * 2.0).abs() < 1e-4);
    }

    #[test]
    fn equipment_bonus_layers_over_base_max_hp() {
        let mut p = player();
        let base = p.base_max_hp;

        p.equip(
            GearSlot::Armor,
            GearItem {
                name: "Iron Plate".to_string(),
                hp_bonus: 40.0,
            },
        );
        assert_eq!(p.max_hp, base + 40.0);

        // Server pushes a new base (level-up); bonus stays layered
        p.set_base_max_hp(base + 20.0);
        assert_eq!(p.max_hp, base + 60.0);

        p.unequip(GearSlot::Armor);
        assert_eq!(p.max_hp, base + 20.0);
    }

    #[test]
    fn death_zeroes_radius_and_respawn_restores_it() {
        let mut p = player();
        let radius = p.radius;
        p.mark_dead();
        assert_eq!(p.radius, 0.0);
        assert!(p.awaiting_respawn);
        assert!(!p.can_move(0));

        p.respawn(5.0, 6.0);
        assert_eq!(p.radius, radius);
        assert_eq!((p.x, p.y), (5.0, 6.0));
        assert!(p.can_move(0));
    }

    #[test]
    fn set_hp_clamps_to_bounds() {
        let mut p = player();
        p.set_hp(p.max_hp + 50.0);
        assert_eq!(p.hp, p.max_hp);
        p.set_hp(-10.0);
        assert_eq!(p.hp, 0.0);
    }
}
