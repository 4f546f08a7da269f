//! Entity store: the client-side mirror of server-authoritative state
//!
//! Owned by the client actor; the presentation layer reads it each frame and
//! mutates it only through the named operations exposed here and on the
//! contained types. No I/O happens at this layer.

pub mod effects;
pub mod map;
pub mod player;
pub mod remote;

pub use effects::EffectLog;
pub use map::{GameMap, MapShape, Wall};
pub use player::{BuffKind, ClassStats, GearItem, GearSlot, LocalBuff, LocalPlayer, PlayerClass};
pub use remote::{MobPatch, PlayerPatch, ProjectilePatch, RemoteWorld};

/// All client-side game state, constructed once at startup
#[derive(Debug)]
pub struct EntityStore {
    pub player: LocalPlayer,
    pub remote: RemoteWorld,
    /// Absent until the welcome message delivers map parameters
    pub map: Option<GameMap>,
    pub effects: EffectLog,
}

impl EntityStore {
    pub fn new(name: String, class: PlayerClass) -> Self {
        Self {
            player: LocalPlayer::new(name, class),
            remote: RemoteWorld::default(),
            map: None,
            effects: EffectLog::default(),
        }
    }

    /// Replace the map wholesale (welcome / match_start)
    pub fn set_map(&mut self, map: GameMap) {
        self.map = Some(map);
    }

    /// True once the local player has a server identity
    pub fn has_identity(&self) -> bool {
        self.player.id.is_some()
    }

    /// Whether an id refers to the local player
    pub fn is_self(&self, id: &str) -> bool {
        self.player.id.as_deref() == Some(id)
    }
}
