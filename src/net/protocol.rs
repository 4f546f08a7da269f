//! Wire protocol message definitions
//!
//! JSON messages tagged by a `t` field, one message per event. The server owns
//! the schema; payload field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::map::Wall;
use crate::store::player::{BuffKind, GearItem, GearSlot, PlayerClass};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Join request carrying the chosen display name and class
    Join { name: String, class: PlayerClass },

    /// Periodic movement intent, sent on a fixed interval
    Input {
        /// Strictly increasing sequence number
        seq: u64,
        input: InputVec,
    },

    /// Cast the skill in a hotbar slot
    #[serde(rename_all = "camelCase")]
    Cast {
        slot: u32,
        class: PlayerClass,
        /// Client timestamp in Unix millis
        ts: u64,
        angle: f32,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        aim_x: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        aim_y: Option<f32>,
    },

    /// Chat message with a client-generated correlation id
    #[serde(rename_all = "camelCase")]
    Chat { text: String, chat_id: Uuid },

    /// Equip an item into a gear slot
    Equip { slot: GearSlot, item: GearItem },

    /// Latency probe
    Ping { ts: u64 },
}

/// Movement intent vector, magnitude <= 1
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InputVec {
    pub x: f32,
    pub y: f32,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMsg {
    /// First handshake reply: identity, stats, and map parameters
    Welcome(WelcomeMsg),

    /// Matchmaking queue position
    QueueUpdate { position: u32, size: u32 },

    /// A match was created for us
    #[serde(rename_all = "camelCase")]
    MatchCreated { match_id: String },

    /// Countdown before the match starts
    MatchCountdown { seconds: f32 },

    /// Match began; re-applies map/spawn/stats like welcome
    MatchStart(MatchStartMsg),

    /// Periodic authoritative broadcast of all visible entities
    Snapshot(SnapshotMsg),

    /// Broadcast chat line
    #[serde(rename_all = "camelCase")]
    Chat {
        from: String,
        text: String,
        #[serde(default)]
        chat_id: Option<Uuid>,
    },

    /// Our chat message was rejected
    #[serde(rename_all = "camelCase")]
    ChatBlocked {
        reason: String,
        #[serde(default)]
        chat_id: Option<Uuid>,
    },

    /// Someone levelled up; informational only
    PlayerLevelup {
        id: String,
        #[serde(default)]
        name: String,
        level: u32,
    },

    /// A mob died, possibly killed by us
    #[serde(rename_all = "camelCase")]
    MobDied {
        mob_id: String,
        #[serde(default)]
        killer_id: Option<String>,
        #[serde(default)]
        xp: u64,
    },

    /// Transient cast visual, optionally carrying a buff for the local player
    CastEffect(CastEffectMsg),

    /// Stun the named entity until the given Unix millis
    #[serde(rename_all = "camelCase")]
    Stun { target_id: String, until: u64 },

    /// Damage landed on a player
    PlayerHurt { id: String, damage: f32, hp: f32 },

    /// A player was healed
    PlayerHealed { id: String, amount: f32, hp: f32 },

    /// The server refused one of our casts
    CastRejected { slot: u32, reason: String },

    /// A player died
    #[serde(rename_all = "camelCase")]
    PlayerDied {
        id: String,
        #[serde(default)]
        killer_id: Option<String>,
    },
}

/// Welcome payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub id: String,
    #[serde(default)]
    pub class: Option<PlayerClass>,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub next_level_xp: Option<u64>,
    #[serde(default)]
    pub max_hp: Option<f32>,
    #[serde(flatten)]
    pub map: MapParams,
}

/// Match start payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStartMsg {
    #[serde(default)]
    pub match_id: Option<String>,
    #[serde(default)]
    pub spawn_x: Option<f32>,
    #[serde(default)]
    pub spawn_y: Option<f32>,
    #[serde(default)]
    pub max_hp: Option<f32>,
    #[serde(flatten)]
    pub map: MapParams,
}

/// Map geometry as carried by welcome/match_start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapParams {
    #[serde(default)]
    pub map_type: Option<String>,
    /// Radius for circular maps
    #[serde(default)]
    pub map_radius: Option<f32>,
    /// Half-extent for square maps
    #[serde(default)]
    pub map_half: Option<f32>,
    #[serde(default)]
    pub center_x: f32,
    #[serde(default)]
    pub center_y: f32,
    #[serde(default)]
    pub walls: Option<Vec<Wall>>,
}

/// Snapshot payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotMsg {
    #[serde(default)]
    pub players: Vec<PlayerSnap>,
    #[serde(default)]
    pub mobs: Vec<MobSnap>,
    #[serde(default)]
    pub projectiles: Vec<ProjectileSnap>,
    /// Incremental wall update, rare
    #[serde(default)]
    pub walls: Option<Vec<Wall>>,
}

/// One player entry in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnap {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub kills: u32,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub max_hp: f32,
    #[serde(default = "default_player_radius")]
    pub radius: f32,
    #[serde(default)]
    pub xp: Option<u64>,
    #[serde(default)]
    pub next_level_xp: Option<u64>,
}

/// One mob entry in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobSnap {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub hp: f32,
    pub max_hp: f32,
    #[serde(default = "default_mob_radius")]
    pub radius: f32,
}

/// One projectile entry in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileSnap {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub owner_id: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub vx: f32,
    #[serde(default)]
    pub vy: f32,
    #[serde(default = "default_projectile_radius")]
    pub radius: f32,
}

/// Cast effect payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastEffectMsg {
    pub skill: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub radius: f32,
    #[serde(default = "default_color")]
    pub color: String,
    /// "melee" or "ring"; anything else renders as a ring
    #[serde(default)]
    pub shape: Option<String>,
    #[serde(default)]
    pub buff: Option<BuffPayload>,
}

/// A buff granted by a cast effect
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuffPayload {
    pub target_id: String,
    pub kind: BuffKind,
    pub multiplier: f32,
    pub duration_ms: u64,
}

fn default_level() -> u32 {
    1
}

fn default_color() -> String {
    "#ffffff".to_string()
}

fn default_player_radius() -> f32 {
    20.0
}

fn default_mob_radius() -> f32 {
    14.0
}

fn default_projectile_radius() -> f32 {
    4.0
}

/// Protocol-level decode errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Well-formed JSON with a tag we do not handle (protocol drift)
    #[error("unhandled message tag '{tag}'")]
    UnknownTag { tag: String },

    /// Not decodable as any known message
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode one inbound frame. Unknown tags are distinguished from malformed
/// payloads so the session can log protocol drift loudly.
pub fn parse_server_msg(raw: &str) -> Result<ServerMsg, ProtocolError> {
    match serde_json::from_str::<ServerMsg>(raw) {
        Ok(msg) => Ok(msg),
        Err(err) => {
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) {
                if let Some(tag) = value.get("t").and_then(|t| t.as_str()) {
                    const KNOWN: [&str; 16] = [
                        "welcome",
                        "queue_update",
                        "match_created",
                        "match_countdown",
                        "match_start",
                        "snapshot",
                        "chat",
                        "chat_blocked",
                        "player_levelup",
                        "mob_died",
                        "cast_effect",
                        "stun",
                        "player_hurt",
                        "player_healed",
                        "cast_rejected",
                        "player_died",
                    ];
                    if !KNOWN.contains(&tag) {
                        return Err(ProtocolError::UnknownTag {
                            tag: tag.to_string(),
                        });
                    }
                }
            }
            Err(ProtocolError::Malformed(err))
        }
    }
}

/// Encode an outbound message
pub fn encode_client_msg(msg: &ClientMsg) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_parses_with_minimal_fields() {
        let raw = r#"{"t":"welcome","id":"42","mapType":"circle","mapRadius":750}"#;
        let msg = parse_server_msg(raw).unwrap();
        match msg {
            ServerMsg::Welcome(w) => {
                assert_eq!(w.id, "42");
                assert_eq!(w.map.map_type.as_deref(), Some("circle"));
                assert_eq!(w.map.map_radius, Some(750.0));
                assert_eq!(w.level, 1);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn snapshot_parses_entity_lists() {
        let raw = r#"{"t":"snapshot","players":[{"id":"42","x":10,"y":20,"hp":200,"maxHp":200}],"mobs":[{"id":"m1","type":"slime","x":1,"y":2,"hp":50,"maxHp":50}]}"#;
        let msg = parse_server_msg(raw).unwrap();
        match msg {
            ServerMsg::Snapshot(s) => {
                assert_eq!(s.players.len(), 1);
                assert_eq!(s.players[0].max_hp, 200.0);
                assert_eq!(s.mobs[0].kind, "slime");
                assert!(s.projectiles.is_empty());
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unknown_tag_is_reported_as_drift() {
        let raw = r#"{"t":"guild_invite","from":"Bo"}"#;
        match parse_server_msg(raw) {
            Err(ProtocolError::UnknownTag { tag }) => assert_eq!(tag, "guild_invite"),
            other => panic!("expected unknown tag error, got {other:?}"),
        }
    }

    #[test]
    fn malformed_payload_is_not_drift() {
        let raw = r#"{"t":"stun","targetId":42}"#; // id must be a string
        assert!(matches!(
            parse_server_msg(raw),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            parse_server_msg("not json"),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn outbound_messages_use_snake_case_tags() {
        let join = encode_client_msg(&ClientMsg::Join {
            name: "Ada".to_string(),
            class: PlayerClass::Mage,
        })
        .unwrap();
        assert!(join.contains(r#""t":"join""#));
        assert!(join.contains(r#""class":"mage""#));

        let input = encode_client_msg(&ClientMsg::Input {
            seq: 7,
            input: InputVec { x: 0.5, y: -0.5 },
        })
        .unwrap();
        assert!(input.contains(r#""seq":7"#));

        let cast = encode_client_msg(&ClientMsg::Cast {
            slot: 2,
            class: PlayerClass::Mage,
            ts: 123,
            angle: 0.0,
            target_id: None,
            aim_x: Some(3.0),
            aim_y: Some(4.0),
        })
        .unwrap();
        assert!(cast.contains(r#""aimX":3.0"#));
        assert!(!cast.contains("targetId"));
    }
}
