//! Configuration types for the auction room server.

use rostrum_core::retry::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Configuration for the HTTP/SSE server and its rooms.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// The address to bind the server to
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Depth of each room's serialized command queue. Submissions beyond
    /// this apply backpressure to the submitter, never to deciders of other
    /// rooms.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Capacity of each fan-out broadcast channel. A subscriber that lags
    /// further than this silently skips ahead; streams are display plumbing,
    /// not state transfer.
    #[serde(default = "default_fanout_capacity")]
    pub fanout_capacity: usize,

    /// Trailing overlay events replayed to a fresh room subscriber
    #[serde(default = "default_overlay_backlog")]
    pub overlay_backlog: usize,

    /// Trailing audit entries replayed to a fresh moderator subscriber
    #[serde(default = "default_log_backlog")]
    pub log_backlog: usize,

    /// Backoff schedule for deposit status polling
    #[serde(default)]
    pub deposit_poll: BackoffPolicy,
}

fn default_bind_address() -> SocketAddr {
    "0.0.0.0:8080".parse().expect("infallible!")
}

fn default_queue_depth() -> usize {
    24
}

fn default_fanout_capacity() -> usize {
    32
}

fn default_overlay_backlog() -> usize {
    3
}

fn default_log_backlog() -> usize {
    50
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            queue_depth: default_queue_depth(),
            fanout_capacity: default_fanout_capacity(),
            overlay_backlog: default_overlay_backlog(),
            log_backlog: default_log_backlog(),
            deposit_poll: BackoffPolicy::default(),
        }
    }
}
