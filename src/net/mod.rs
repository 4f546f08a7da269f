//! Networking: wire protocol, message dispatch, and the connection session

pub mod dispatch;
pub mod protocol;
pub mod session;

pub use dispatch::{dispatch, SideEffect};
pub use session::{ClientSession, SessionError};

/// Where the client is in the match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// Title/login, no match association
    Title,
    /// Waiting in the matchmaking queue
    Queued,
    /// Match created, countdown running
    Countdown,
    /// Gameplay in progress
    Playing,
}

/// Per-connection handshake and match state.
///
/// Replaced, never mutated in place, when a reconnect builds a new session.
#[derive(Debug)]
pub struct SessionState {
    pub welcome_received: bool,
    pub first_snapshot_received: bool,
    /// True from connect until the first snapshot lands
    pub loading: bool,
    pub phase: GamePhase,
    pub match_id: Option<String>,
    /// Countdown deadline in Unix millis, if a countdown is running
    pub countdown_until_ms: Option<u64>,
    pub queue_position: Option<(u32, u32)>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            welcome_received: false,
            first_snapshot_received: false,
            loading: true,
            phase: GamePhase::Title,
            match_id: None,
            countdown_until_ms: None,
            queue_position: None,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
