//! Host bridge: the typed RPC boundary to the privileged host process.
//!
//! [`HostBridge`] is the only way the controller reaches the host. Two
//! transports implement it: an in-process channel ([`channel`]) and a
//! child-process stdio transport ([`stdio`]).

pub mod channel;
pub mod contract;
pub mod events;
pub mod stdio;

use crate::error::Result;
use async_trait::async_trait;
use contract::{HostRequest, HostResponse};
use events::{EventHandler, Subscription};

/// Request/response and event-subscription access to the host.
///
/// `invoke` has no built-in timeout; it resolves when the host replies or
/// the channel is torn down. Wrap calls in `tokio::time::timeout` for bounded
/// latency.
#[async_trait]
pub trait HostBridge: Send + Sync {
    /// Send a typed request and wait for its typed response.
    async fn invoke(&self, request: HostRequest) -> Result<HostResponse>;

    /// Register `handler` for unsolicited events named `event`.
    fn subscribe(&self, event: &str, handler: EventHandler) -> Subscription;
}

/// Generate a fresh request/event identifier.
#[must_use]
pub fn new_envelope_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
