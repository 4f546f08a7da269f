//! Transient presentation state: floating texts, cast visuals, cooldowns, chat
//!
//! Everything here is client-local and disposable. Cast visuals and cooldowns
//! are applied optimistically at cast time and rolled back (best effort) when
//! the server rejects the cast.

use uuid::Uuid;

/// How long a floating text stays renderable
pub const FLOAT_TEXT_LIFETIME_MS: u64 = 1_200;

/// Age window inside which an optimistic cast visual may be rolled back
pub const CAST_UNDO_WINDOW_MS: u64 = 2_000;

/// Distance from the player inside which a rollback candidate must sit
pub const CAST_UNDO_RADIUS: f32 = 120.0;

/// Number of action slots on the hotbar
pub const NUM_ACTION_SLOTS: usize = 4;

/// Damage numbers, heal numbers, XP popups
#[derive(Debug, Clone)]
pub struct FloatingText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub color: String,
    pub created_ms: u64,
}

/// Shape of a transient cast visual
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastVisualKind {
    /// Short melee flash in front of the caster
    MeleeArc,
    /// Expanding ring for area casts
    AreaRing,
}

/// A transient visual for a cast, server-confirmed or optimistic
#[derive(Debug, Clone)]
pub struct CastVisual {
    pub skill: String,
    pub kind: CastVisualKind,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub color: String,
    pub created_ms: u64,
    /// Placed locally before server confirmation; eligible for rollback
    pub optimistic: bool,
    /// Hotbar slot that produced an optimistic visual (wire numbering)
    pub slot: Option<u32>,
}

/// One line in the chat panel
#[derive(Debug, Clone)]
pub struct ChatLine {
    pub from: String,
    pub text: String,
    pub system: bool,
    /// Local echo still waiting for the server's broadcast
    pub pending: bool,
    pub chat_id: Option<Uuid>,
}

/// Client-local effect and chat state
#[derive(Debug, Default)]
pub struct EffectLog {
    pub floating_texts: Vec<FloatingText>,
    pub cast_visuals: Vec<CastVisual>,
    /// Per-slot cooldown expiry in Unix millis, wire slot N at index N-1
    cooldown_until_ms: [u64; NUM_ACTION_SLOTS],
    pub chat: Vec<ChatLine>,
    /// Transient status line (connection errors, rejections)
    pub status: Option<String>,
}

impl EffectLog {
    pub fn push_text(&mut self, text: String, x: f32, y: f32, color: &str, now_ms: u64) {
        self.floating_texts.push(FloatingText {
            text,
            x,
            y,
            color: color.to_string(),
            created_ms: now_ms,
        });
    }

    pub fn push_visual(&mut self, visual: CastVisual) {
        self.cast_visuals.push(visual);
    }

    /// Drop floating texts and visuals that have outlived their display window
    pub fn prune(&mut self, now_ms: u64) {
        self.floating_texts
            .retain(|t| now_ms.saturating_sub(t.created_ms) < FLOAT_TEXT_LIFETIME_MS);
        self.cast_visuals
            .retain(|v| now_ms.saturating_sub(v.created_ms) < CAST_UNDO_WINDOW_MS);
    }

    /// Start a cooldown for a hotbar slot (wire numbering, 1-based)
    pub fn begin_cooldown(&mut self, slot: u32, duration_ms: u64, now_ms: u64) {
        if let Some(entry) = self.slot_entry(slot) {
            *entry = now_ms + duration_ms;
        }
    }

    /// Remaining cooldown for a slot in milliseconds
    pub fn cooldown_remaining_ms(&self, slot: u32, now_ms: u64) -> u64 {
        match slot_index(slot) {
            Some(i) => self.cooldown_until_ms[i].saturating_sub(now_ms),
            None => 0,
        }
    }

    pub fn slot_ready(&self, slot: u32, now_ms: u64) -> bool {
        self.cooldown_remaining_ms(slot, now_ms) == 0
    }

    /// Undo the optimistic state for a rejected cast: reset the slot cooldown
    /// and drop any optimistic visual for that slot placed recently near the
    /// player. The pairing is heuristic; the client cannot know exactly which
    /// visual belonged to the rejected cast.
    pub fn rollback_cast(&mut self, slot: u32, player_x: f32, player_y: f32, now_ms: u64) {
        if let Some(entry) = self.slot_entry(slot) {
            *entry = 0;
        }
        self.cast_visuals.retain(|v| {
            if !v.optimistic || v.slot != Some(slot) {
                return true;
            }
            let age = now_ms.saturating_sub(v.created_ms);
            let dx = v.x - player_x;
            let dy = v.y - player_y;
            let near = dx * dx + dy * dy <= CAST_UNDO_RADIUS * CAST_UNDO_RADIUS;
            !(age <= CAST_UNDO_WINDOW_MS && near)
        });
    }

    /// Append the local echo for an outbound chat message
    pub fn push_chat_echo(&mut self, from: &str, text: &str, chat_id: Uuid) {
        self.chat.push(ChatLine {
            from: from.to_string(),
            text: text.to_string(),
            system: false,
            pending: true,
            chat_id: Some(chat_id),
        });
    }

    /// Reconcile an inbound chat line against a pending echo. Returns true if
    /// an echo was confirmed in place; otherwise the caller appends a new line.
    pub fn confirm_chat(&mut self, chat_id: Option<Uuid>) -> bool {
        let Some(id) = chat_id else { return false };
        match self
            .chat
            .iter_mut()
            .find(|l| l.pending && l.chat_id == Some(id))
        {
            Some(line) => {
                line.pending = false;
                true
            }
            None => false,
        }
    }

    /// Remove a blocked echo and surface the server's reason
    pub fn reject_chat(&mut self, chat_id: Option<Uuid>, reason: &str) {
        if let Some(id) = chat_id {
            self.chat.retain(|l| !(l.pending && l.chat_id == Some(id)));
        }
        self.push_system(&format!("Message blocked: {reason}"));
    }

    pub fn push_chat(&mut self, from: &str, text: &str) {
        self.chat.push(ChatLine {
            from: from.to_string(),
            text: text.to_string(),
            system: false,
            pending: false,
            chat_id: None,
        });
    }

    pub fn push_system(&mut self, text: &str) {
        self.chat.push(ChatLine {
            from: String::new(),
            text: text.to_string(),
            system: true,
            pending: false,
            chat_id: None,
        });
    }

    pub fn set_status(&mut self, text: &str) {
        self.status = Some(text.to_string());
    }

    fn slot_entry(&mut self, slot: u32) -> Option<&mut u64> {
        slot_index(slot).map(|i| &mut self.cooldown_until_ms[i])
    }
}

/// Wire slots are 1-based; out-of-range slots are ignored
fn slot_index(slot: u32) -> Option<usize> {
    let i = slot.checked_sub(1)? as usize;
    (i < NUM_ACTION_SLOTS).then_some(i)
}
