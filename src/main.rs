//! Arena client - headless shell
//!
//! Connects to the game server, joins with the configured name/class, and
//! runs the prediction/reconciliation loop without a renderer attached.
//! Useful for soak-testing the netcode and as the reference embedding of the
//! client core.

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_client::app::ClientApp;
use arena_client::config::Config;
use arena_client::net::session::SessionError;
use arena_client::sim::ScriptedIntent;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Arena client");
    info!("Server: {}", config.server_url);
    info!(
        "Joining as '{}' ({})",
        config.display_name, config.player_class
    );

    let app = ClientApp::new(config);
    let control = app.control();

    // Ctrl+C tears the session down cleanly
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down");
            control.shutdown().await;
        }
    });

    // Headless shell: idle intent, the server still sees us as present
    match app.run(ScriptedIntent::new()).await {
        Ok(()) => {
            info!("Client exited cleanly");
            Ok(())
        }
        Err(SessionError::LoadFailed) => {
            error!("Could not complete the initial load; is the server accepting joins?");
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
