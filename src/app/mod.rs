//! Application assembly

mod state;

pub use state::{ClientApp, ControlHandle};
