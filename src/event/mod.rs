//! Worker-to-foreground event handoff.
//!
//! The worker never calls foreground code directly. It posts events onto a
//! channel through [`EventDispatcher`]; the foreground drains them, in
//! production order, by calling [`EventPump::pump_events`] from its own loop.
//! An [`OwnerToken`] guards both ends: once the owning client is torn down the
//! token is dead and events are silently dropped instead of reaching a
//! destroyed owner.

mod pump;

#[cfg(test)]
mod tests;

pub use pump::EventPump;
pub(crate) use pump::{event_channel, EventDispatcher};

use crate::codec::InboundMessage;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Something the worker observed that the owner should hear about.
/// Produced only by the worker thread, delivered at most once each.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    Connected,
    Disconnected { reason: String },
    MessageReceived(InboundMessage),
}

/// Liveness flag for the owning client. Cloned freely; never keeps the owner
/// alive. Flipped false exactly once during owner teardown, before the worker
/// is asked to stop, so no callback can race the owner's destruction.
#[derive(Clone, Debug)]
pub(crate) struct OwnerToken(Arc<AtomicBool>);

impl OwnerToken {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the owner dead. Returns true only for the call that did the flip.
    pub(crate) fn retire(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}
