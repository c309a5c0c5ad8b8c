//! Web server shared state.

use std::sync::Arc;
use std::time::Instant;

use crate::channels::ChannelCollector;
use crate::tuner::Allocator;

/// Shared state for web handlers.
pub struct WebState {
    pub allocator: Arc<Allocator>,
    pub channels: ChannelCollector,
    pub started_at: Instant,
}

impl WebState {
    pub fn new(allocator: Arc<Allocator>, channels: ChannelCollector) -> Self {
        Self {
            allocator,
            channels,
            started_at: Instant::now(),
        }
    }

    /// Seconds since the server started.
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
