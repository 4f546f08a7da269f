//! Prediction and interpolation engine
//!
//! Runs once per rendered frame regardless of network activity: predicts the
//! local player from input intent, softly reconciles against server truth, and
//! blends remote entities toward their latest snapshot targets.

pub mod intent;
pub mod interp;
pub mod predict;

pub use intent::{ActionRequest, IntentSource, ScriptedIntent};

use crate::store::EntityStore;
use crate::util::time::clamp_frame_dt;

/// Advance the whole client simulation one frame
pub fn step_frame(store: &mut EntityStore, intent: (f32, f32), raw_dt: f32, now_ms: u64) {
    let dt = clamp_frame_dt(raw_dt);
    predict::step_local_player(store, intent, dt, now_ms);
    interp::step_remote_entities(&mut store.remote, dt);
    store.effects.prune(now_ms);
}
