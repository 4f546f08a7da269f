//! Arena game client core
//!
//! The state reconciliation and prediction engine for a real-time multiplayer
//! top-down arena RPG. The server owns all gameplay truth; this crate keeps a
//! local mirror of it, predicts the local player between server updates,
//! interpolates remote entities, and manages the connection lifecycle.
//!
//! Rendering, widget construction, and raw input handling live outside this
//! crate: the presentation layer reads the [`store::EntityStore`] each frame,
//! and an [`sim::IntentSource`] implementation feeds movement and actions in.

pub mod app;
pub mod config;
pub mod net;
pub mod sim;
pub mod store;
pub mod util;
