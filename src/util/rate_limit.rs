//! Outbound rate limiting
//!
//! The server drops or blocks spammy clients; limiting ourselves first keeps
//! the session healthy and gives immediate local feedback instead of a
//! round-trip rejection.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Max chat messages sent per second
pub const CHAT_RATE_LIMIT: u32 = 3;

/// Max cast requests sent per second
pub const CAST_RATE_LIMIT: u32 = 10;

/// Limits for the client's own outbound traffic
#[derive(Clone)]
pub struct OutboundLimiter {
    chat: Arc<Limiter>,
    cast: Arc<Limiter>,
}

impl OutboundLimiter {
    pub fn new() -> Self {
        Self {
            chat: create_limiter(CHAT_RATE_LIMIT),
            cast: create_limiter(CAST_RATE_LIMIT),
        }
    }

    /// Check if a chat message may be sent now
    pub fn allow_chat(&self) -> bool {
        self.chat.check().is_ok()
    }

    /// Check if a cast request may be sent now
    pub fn allow_cast(&self) -> bool {
        self.cast.check().is_ok()
    }
}

impl Default for OutboundLimiter {
    fn default() -> Self {
        Self::new()
    }
}
