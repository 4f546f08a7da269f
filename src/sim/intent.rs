//! Intent producer interface
//!
//! Raw key/mouse handling lives outside the core; the engine only consumes a
//! movement vector and a queue of discrete action requests per frame.

use crate::store::{GearItem, GearSlot};

/// A discrete action requested by the player this frame
#[derive(Debug, Clone)]
pub enum ActionRequest {
    /// Cast the skill in a hotbar slot (wire numbering, 1-based)
    Cast {
        slot: u32,
        angle: f32,
        target_id: Option<String>,
        aim: Option<(f32, f32)>,
    },
    /// Send a chat message
    Chat { text: String },
    /// Equip an item into a gear slot (UI-owned mutation path)
    Equip { slot: GearSlot, item: GearItem },
}

/// Per-frame input surface the core polls
pub trait IntentSource {
    /// Movement vector with magnitude <= 1. Implementations return zero while
    /// the chat box is focused; the engine additionally zeroes it when the
    /// player is dead, awaiting respawn, or stunned.
    fn movement(&mut self) -> (f32, f32);

    /// Discrete actions requested since the last poll
    fn drain_actions(&mut self) -> Vec<ActionRequest>;
}

/// Scripted intent source for tests and the headless demo binary
#[derive(Debug, Default)]
pub struct ScriptedIntent {
    pub movement: (f32, f32),
    queued: Vec<ActionRequest>,
}

impl ScriptedIntent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, action: ActionRequest) {
        self.queued.push(action);
    }
}

impl IntentSource for ScriptedIntent {
    fn movement(&mut self) -> (f32, f32) {
        self.movement
    }

    fn drain_actions(&mut self) -> Vec<ActionRequest> {
        std::mem::take(&mut self.queued)
    }
}
