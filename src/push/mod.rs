//! Push-driven freshness for streaming widgets.
//!
//! The real-time transport (a WebSocket owned by the dashboard) delivers
//! events per [`Channel`]. The [`PushBridge`] writes them straight into the
//! store, so push-refreshed entries stay current without re-polling.

mod bridge;
mod channel;

pub use bridge::{PushBridge, PushEvent, PushMode, shallow_merge};
pub use channel::Channel;
