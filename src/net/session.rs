//! Connection session: transport lifecycle, input sending, reconnect backoff
//!
//! One session per connection attempt. All store mutation happens on the
//! actor task running `ClientSession::run`, which serializes the frame tick,
//! inbound messages, and the periodic input sender onto a single `select!`
//! loop; no other task touches the entity store.

use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::net::dispatch::{dispatch, SideEffect};
use crate::net::protocol::{encode_client_msg, parse_server_msg, ClientMsg, InputVec, ProtocolError};
use crate::net::{GamePhase, SessionState};
use crate::sim::{self, ActionRequest, IntentSource};
use crate::store::{EntityStore, PlayerClass};
use crate::util::rate_limit::OutboundLimiter;
use crate::util::time::{
    unix_millis, Timer, FRAME_INTERVAL_MS, INPUT_SEND_INTERVAL_MS, PING_INTERVAL_MS,
};

type WsError = tokio_tungstenite::tungstenite::Error;

/// Session-level failures surfaced to the shell
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),

    /// The connection died before the handshake completed; the shell returns
    /// to the title screen instead of auto-reconnecting.
    #[error("connection lost during initial load")]
    LoadFailed,
}

/// Control inputs from the shell/UI task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMsg {
    /// Stop the pending reconnect countdown; no further automatic attempts
    CancelReconnect,
    /// Tear the session down entirely
    Shutdown,
}

/// Exponential reconnect backoff with a cap
#[derive(Debug, Clone)]
pub struct Backoff {
    base_ms: u64,
    cap_ms: u64,
    attempt: u32,
}

impl Backoff {
    pub fn new(base_ms: u64, cap_ms: u64) -> Self {
        Self {
            base_ms,
            cap_ms,
            attempt: 0,
        }
    }

    /// Delay for the next attempt, doubling each failure up to the cap
    pub fn next_delay_ms(&mut self) -> u64 {
        let delay = self
            .base_ms
            .saturating_mul(1u64 << self.attempt.min(32))
            .min(self.cap_ms);
        self.attempt += 1;
        delay
    }

    /// Reset after a successful open
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Whether the periodic input timer should actually send this tick
fn input_send_allowed(state: &SessionState) -> bool {
    state.welcome_received && state.phase == GamePhase::Playing
}

/// How one connection ended
enum ConnOutcome {
    /// Dropped after gameplay started; eligible for reconnect
    Dropped,
    /// Died before welcome/first snapshot; back to title, no auto-reconnect
    LoadFailed,
    /// Shell asked us to stop
    Shutdown,
}

/// The client actor: owns the entity store and drives everything
pub struct ClientSession {
    url: String,
    name: String,
    class: PlayerClass,
    pub store: EntityStore,
    pub state: SessionState,
    limiter: OutboundLimiter,
    backoff: Backoff,
    input_seq: u64,
    last_intent: (f32, f32),
}

impl ClientSession {
    pub fn new(config: &Config) -> Self {
        let class = PlayerClass::parse(&config.player_class);
        Self {
            url: config.server_url.clone(),
            name: config.display_name.clone(),
            class,
            store: EntityStore::new(config.display_name.clone(), class),
            state: SessionState::new(),
            limiter: OutboundLimiter::new(),
            backoff: Backoff::new(config.reconnect_base_ms, config.reconnect_cap_ms),
            input_seq: 0,
            last_intent: (0.0, 0.0),
        }
    }

    /// Connect and run until shutdown, load failure, or cancelled reconnect
    pub async fn run<I: IntentSource>(
        mut self,
        mut intent: I,
        mut ctrl: mpsc::Receiver<ControlMsg>,
    ) -> Result<(), SessionError> {
        loop {
            // Fresh handshake state per connection
            self.state = SessionState::new();

            let outcome = match connect_async(self.url.as_str()).await {
                Ok((ws, _resp)) => {
                    info!(url = %self.url, "Connected to server");
                    self.run_connection(ws, &mut intent, &mut ctrl).await?
                }
                Err(e) => {
                    // Construction failure: clean up as a load failure but
                    // still schedule a reconnect
                    warn!(error = %e, "Connection attempt failed");
                    self.state.loading = false;
                    self.state.phase = GamePhase::Title;
                    ConnOutcome::Dropped
                }
            };

            match outcome {
                ConnOutcome::Shutdown => {
                    info!("Session shut down");
                    return Ok(());
                }
                ConnOutcome::LoadFailed => {
                    self.state.loading = false;
                    self.state.phase = GamePhase::Title;
                    error!("Connection lost during initial load; returning to title");
                    return Err(SessionError::LoadFailed);
                }
                ConnOutcome::Dropped => {
                    if !self.reconnect_countdown(&mut ctrl).await {
                        info!("Reconnect cancelled");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Run one open connection to completion. A failed send is a lost
    /// connection like any other, never a session-fatal error.
    async fn run_connection<S, I>(
        &mut self,
        mut ws: S,
        intent: &mut I,
        ctrl: &mut mpsc::Receiver<ControlMsg>,
    ) -> Result<ConnOutcome, SessionError>
    where
        S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError> + Unpin,
        I: IntentSource,
    {
        self.backoff.reset();

        let join = ClientMsg::Join {
            name: self.name.clone(),
            class: self.class,
        };
        if !self.send_or_lost(&mut ws, &join).await? {
            return Ok(self.close_outcome());
        }

        let mut frame_tick = interval(Duration::from_millis(FRAME_INTERVAL_MS));
        frame_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut input_tick = interval(Duration::from_millis(INPUT_SEND_INTERVAL_MS));
        input_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ping_tick = interval(Duration::from_millis(PING_INTERVAL_MS));
        let mut frame_timer = Timer::new();

        loop {
            tokio::select! {
                _ = frame_tick.tick() => {
                    let dt = frame_timer.elapsed_secs();
                    frame_timer.reset();
                    self.last_intent = intent.movement();
                    sim::step_frame(&mut self.store, self.last_intent, dt, unix_millis());

                    for action in intent.drain_actions() {
                        if !self.send_action(&mut ws, action).await? {
                            return Ok(self.close_outcome());
                        }
                    }
                }

                _ = input_tick.tick() => {
                    // Silent no-op until gameplay starts; never queued
                    if input_send_allowed(&self.state) {
                        self.input_seq += 1;
                        let msg = ClientMsg::Input {
                            seq: self.input_seq,
                            input: InputVec { x: self.last_intent.0, y: self.last_intent.1 },
                        };
                        if !self.send_or_lost(&mut ws, &msg).await? {
                            return Ok(self.close_outcome());
                        }
                    }
                }

                _ = ping_tick.tick() => {
                    if self.state.welcome_received {
                        let msg = ClientMsg::Ping { ts: unix_millis() };
                        if !self.send_or_lost(&mut ws, &msg).await? {
                            return Ok(self.close_outcome());
                        }
                    }
                }

                frame = ws.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => self.handle_frame(&text),
                        Some(Ok(Message::Binary(_))) => {
                            warn!("Received binary message, ignoring");
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                        Some(Ok(Message::Close(_))) => {
                            info!("Server closed the connection");
                            return Ok(self.close_outcome());
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            self.store.effects.set_status("Connection error");
                            return Ok(self.close_outcome());
                        }
                        None => {
                            debug!("WebSocket stream ended");
                            return Ok(self.close_outcome());
                        }
                    }
                }

                cmd = ctrl.recv() => {
                    match cmd {
                        Some(ControlMsg::Shutdown) | None => {
                            let _ = ws.close().await;
                            return Ok(ConnOutcome::Shutdown);
                        }
                        // No reconnect pending while connected
                        Some(ControlMsg::CancelReconnect) => {}
                    }
                }
            }
        }
    }

    /// Decode and apply one inbound text frame
    fn handle_frame(&mut self, text: &str) {
        match parse_server_msg(text) {
            Ok(msg) => {
                let effects = dispatch(&mut self.store, &mut self.state, msg, unix_millis());
                for effect in effects {
                    match effect {
                        SideEffect::LoadingFinished => {
                            info!("First snapshot applied; gameplay visible");
                        }
                        SideEffect::GameplayStarted => {
                            info!(match_id = ?self.state.match_id, "Match started");
                        }
                        SideEffect::ShowDeathOverlay => {
                            info!("Local player died");
                        }
                    }
                }
            }
            Err(ProtocolError::UnknownTag { tag }) => {
                // Protocol drift: the server speaks a newer dialect
                warn!(tag = %tag, "Discarding message with unhandled tag");
            }
            Err(ProtocolError::Malformed(e)) => {
                warn!(error = %e, "Discarding malformed message");
            }
        }
    }

    /// Translate a discrete action request into an outbound message.
    /// Returns false once the connection is gone.
    async fn send_action<S>(&mut self, ws: &mut S, action: ActionRequest) -> Result<bool, SessionError>
    where
        S: Sink<Message, Error = WsError> + Unpin,
    {
        match action {
            ActionRequest::Cast {
                slot,
                angle,
                target_id,
                aim,
            } => {
                let now = unix_millis();
                if !self.limiter.allow_cast() || !self.store.effects.slot_ready(slot, now) {
                    return Ok(true);
                }
                let msg = ClientMsg::Cast {
                    slot,
                    class: self.class,
                    ts: now,
                    angle,
                    target_id,
                    aim_x: aim.map(|a| a.0),
                    aim_y: aim.map(|a| a.1),
                };
                self.send_or_lost(ws, &msg).await
            }
            ActionRequest::Chat { text } => {
                if !self.limiter.allow_chat() {
                    self.store.effects.push_system("You are chatting too fast");
                    return Ok(true);
                }
                let chat_id = Uuid::new_v4();
                let name = self.store.player.name.clone();
                self.store.effects.push_chat_echo(&name, &text, chat_id);
                self.send_or_lost(ws, &ClientMsg::Chat { text, chat_id }).await
            }
            ActionRequest::Equip { slot, item } => {
                // UI-owned path: local stats update immediately, server follows
                self.store.player.equip(slot, item.clone());
                self.send_or_lost(ws, &ClientMsg::Equip { slot, item }).await
            }
        }
    }

    /// Send one message, folding transport failures into a "connection lost"
    /// signal for the caller. Encode failures still propagate.
    async fn send_or_lost<S>(&mut self, ws: &mut S, msg: &ClientMsg) -> Result<bool, SessionError>
    where
        S: Sink<Message, Error = WsError> + Unpin,
    {
        match send_msg(ws, msg).await {
            Ok(()) => Ok(true),
            Err(SessionError::Transport(e)) => {
                warn!(error = %e, "WebSocket send failed");
                self.store.effects.set_status("Connection error");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// A close mid-load is a load failure; after gameplay it is a drop
    fn close_outcome(&self) -> ConnOutcome {
        if self.state.welcome_received && self.state.first_snapshot_received {
            ConnOutcome::Dropped
        } else {
            ConnOutcome::LoadFailed
        }
    }

    /// Tick the visible reconnect countdown. Returns false if cancelled.
    async fn reconnect_countdown(&mut self, ctrl: &mut mpsc::Receiver<ControlMsg>) -> bool {
        let delay_ms = self.backoff.next_delay_ms();
        let mut remaining_secs = delay_ms.div_ceil(1000);
        info!(
            attempt = self.backoff.attempt(),
            delay_ms, "Scheduling reconnect"
        );
        self.store
            .effects
            .set_status(&format!("Reconnecting in {remaining_secs}s"));

        let mut countdown = interval(Duration::from_secs(1));
        countdown.set_missed_tick_behavior(MissedTickBehavior::Delay);
        countdown.tick().await; // first tick completes immediately

        loop {
            tokio::select! {
                _ = countdown.tick() => {
                    // This tick closes out the last second of the delay
                    if remaining_secs <= 1 {
                        return true;
                    }
                    remaining_secs -= 1;
                    self.store
                        .effects
                        .set_status(&format!("Reconnecting in {remaining_secs}s"));
                }
                cmd = ctrl.recv() => {
                    match cmd {
                        Some(ControlMsg::CancelReconnect) | Some(ControlMsg::Shutdown) | None => {
                            self.store.effects.set_status("Reconnect cancelled");
                            return false;
                        }
                    }
                }
            }
        }
    }
}

/// Send one outbound message over the socket
async fn send_msg<S>(ws: &mut S, msg: &ClientMsg) -> Result<(), SessionError>
where
    S: Sink<Message, Error = WsError> + Unpin,
{
    let json = encode_client_msg(msg)?;
    ws.send(Message::Text(json)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;
    use std::task::{Context, Poll};

    use super::*;
    use crate::sim::ScriptedIntent;

    fn test_config() -> Config {
        Config {
            server_url: "ws://localhost:9".to_string(),
            display_name: "Ada".to_string(),
            player_class: "mage".to_string(),
            log_level: "info".to_string(),
            reconnect_base_ms: 1_000,
            reconnect_cap_ms: 30_000,
        }
    }

    /// Socket whose reads never complete and whose sends start failing after
    /// a set number of successes.
    struct FlakySocket {
        sends_left: usize,
    }

    impl FlakySocket {
        fn failing_after(sends: usize) -> Self {
            Self { sends_left: sends }
        }
    }

    impl Stream for FlakySocket {
        type Item = Result<Message, WsError>;

        fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Poll::Pending
        }
    }

    impl Sink<Message> for FlakySocket {
        type Error = WsError;

        fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn start_send(mut self: Pin<&mut Self>, _item: Message) -> Result<(), WsError> {
            if self.sends_left == 0 {
                return Err(WsError::ConnectionClosed);
            }
            self.sends_left -= 1;
            Ok(())
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }

        fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), WsError>> {
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn backoff_doubles_to_cap_and_resets() {
        let mut backoff = Backoff::new(1_000, 30_000);
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay_ms()).collect();
        assert_eq!(
            delays,
            vec![1_000, 2_000, 4_000, 8_000, 16_000, 30_000, 30_000]
        );
        assert_eq!(backoff.attempt(), 7);

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay_ms(), 1_000);
    }

    #[test]
    fn input_sends_require_welcome_and_gameplay() {
        let mut state = SessionState::new();
        assert!(!input_send_allowed(&state));

        state.welcome_received = true;
        assert!(!input_send_allowed(&state));

        state.phase = GamePhase::Playing;
        assert!(input_send_allowed(&state));

        state.welcome_received = false;
        assert!(!input_send_allowed(&state));
    }

    #[tokio::test]
    async fn reconnect_countdown_is_cancellable() {
        tokio::time::pause();
        let mut session = ClientSession::new(&test_config());
        let (tx, mut rx) = mpsc::channel(4);

        tx.send(ControlMsg::CancelReconnect).await.unwrap();
        assert!(!session.reconnect_countdown(&mut rx).await);

        // Without a cancel, the countdown elapses and asks for a retry
        let retry = session.reconnect_countdown(&mut rx).await;
        assert!(retry);
    }

    #[tokio::test]
    async fn reconnect_countdown_waits_the_scheduled_delay() {
        tokio::time::pause();
        let mut session = ClientSession::new(&test_config());
        let (_tx, mut rx) = mpsc::channel(4);

        let start = tokio::time::Instant::now();
        assert!(session.reconnect_countdown(&mut rx).await);
        let first = start.elapsed();
        assert!(
            first >= Duration::from_millis(1_000) && first < Duration::from_millis(1_100),
            "first delay was {first:?}"
        );

        // Second attempt doubles the delay
        let start = tokio::time::Instant::now();
        assert!(session.reconnect_countdown(&mut rx).await);
        let second = start.elapsed();
        assert!(
            second >= Duration::from_millis(2_000) && second < Duration::from_millis(2_100),
            "second delay was {second:?}"
        );
    }

    #[tokio::test]
    async fn send_failure_mid_game_drops_to_reconnect() {
        tokio::time::pause();
        let mut session = ClientSession::new(&test_config());
        session.state.welcome_received = true;
        session.state.first_snapshot_received = true;
        session.state.phase = GamePhase::Playing;
        let (_tx, mut rx) = mpsc::channel(4);
        let mut intent = ScriptedIntent::new();

        // The join goes through; the next periodic send hits a dead socket
        let ws = FlakySocket::failing_after(1);
        let outcome = session.run_connection(ws, &mut intent, &mut rx).await;
        assert!(matches!(outcome, Ok(ConnOutcome::Dropped)));
        assert_eq!(session.store.effects.status.as_deref(), Some("Connection error"));
    }

    #[tokio::test]
    async fn send_failure_during_load_is_a_load_failure() {
        tokio::time::pause();
        let mut session = ClientSession::new(&test_config());
        let (_tx, mut rx) = mpsc::channel(4);
        let mut intent = ScriptedIntent::new();

        // Not even the join can be sent
        let ws = FlakySocket::failing_after(0);
        let outcome = session.run_connection(ws, &mut intent, &mut rx).await;
        assert!(matches!(outcome, Ok(ConnOutcome::LoadFailed)));
    }
}
