//! Client wiring shared between the binary and embedding code

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::net::session::{ClientSession, ControlMsg, SessionError};
use crate::sim::IntentSource;

/// Handle for controlling a running session from another task (UI, signals)
#[derive(Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlMsg>,
}

impl ControlHandle {
    /// Stop a pending reconnect countdown
    pub async fn cancel_reconnect(&self) {
        let _ = self.tx.send(ControlMsg::CancelReconnect).await;
    }

    /// Tear the session down
    pub async fn shutdown(&self) {
        let _ = self.tx.send(ControlMsg::Shutdown).await;
    }
}

/// The assembled client: one session, one control channel.
///
/// Constructed once at startup and handed to the actor task; nothing here is
/// global. The session owns the entity store for its whole lifetime.
pub struct ClientApp {
    pub config: Arc<Config>,
    session: ClientSession,
    control: ControlHandle,
    ctrl_rx: mpsc::Receiver<ControlMsg>,
}

impl ClientApp {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let session = ClientSession::new(&config);
        let (tx, ctrl_rx) = mpsc::channel(8);

        Self {
            config,
            session,
            control: ControlHandle { tx },
            ctrl_rx,
        }
    }

    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Run the client actor to completion
    pub async fn run<I: IntentSource>(self, intent: I) -> Result<(), SessionError> {
        self.session.run(intent, self.ctrl_rx).await
    }
}
