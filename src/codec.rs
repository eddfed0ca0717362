//! Pluggable wire-protocol boundary. The worker owns exactly one codec and is
//! the only caller; implementations may block, keep sockets, and hold
//! per-connection state without any synchronization of their own.

use crate::command::PublishCommand;
use crate::config::{ConnectTarget, QoS, SessionConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A complete application message read off the wire.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Strategy object implementing the actual protocol: handshake, framing,
/// acknowledgments, keep-alive. Everything here runs on the worker thread.
pub trait WireCodec: Send {
    /// Open the connection and complete the protocol handshake.
    fn establish(&mut self, target: &ConnectTarget, config: &SessionConfig) -> Result<()>;

    fn send_publish(&mut self, publish: &PublishCommand) -> Result<()>;

    fn send_subscribe(&mut self, filter: &str, qos: QoS) -> Result<()>;

    fn send_unsubscribe(&mut self, filter: &str) -> Result<()>;

    /// Non-blocking read; `Ok(None)` when no complete message is available.
    fn poll_receive(&mut self) -> Result<Option<InboundMessage>>;

    /// Keep-alive probe, sent when the session has been quiet for the
    /// configured interval. Protocols without one keep the default.
    fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    /// Drop the connection. Must be safe to call in any state.
    fn teardown(&mut self);
}

/// Codec that accepts everything and never produces inbound traffic. Default
/// collaborator, useful for wiring tests and dry runs.
#[derive(Debug, Default)]
pub struct NoopCodec;

impl WireCodec for NoopCodec {
    fn establish(&mut self, _target: &ConnectTarget, _config: &SessionConfig) -> Result<()> {
        Ok(())
    }

    fn send_publish(&mut self, _publish: &PublishCommand) -> Result<()> {
        Ok(())
    }

    fn send_subscribe(&mut self, _filter: &str, _qos: QoS) -> Result<()> {
        Ok(())
    }

    fn send_unsubscribe(&mut self, _filter: &str) -> Result<()> {
        Ok(())
    }

    fn poll_receive(&mut self) -> Result<Option<InboundMessage>> {
        Ok(None)
    }

    fn teardown(&mut self) {}
}
