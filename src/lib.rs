//! Threaded broker-session client core.
//!
//! A synchronous, foreground-facing client backed by one dedicated worker
//! thread that owns all network I/O through a pluggable [`WireCodec`].
//! Commands flow to the worker over FIFO queues with a condvar wake signal;
//! events flow back through an [`EventPump`] the embedder drains from its own
//! loop, guarded by a liveness token so a destroyed owner is never called
//! back. Shutdown is bounded: graceful exit within a grace period, detach as
//! the fallback.

pub mod client;
pub mod codec;
pub mod command;
pub mod config;
pub mod event;
pub mod logging;
pub mod state;

mod worker;

pub use client::{SessionClient, SHUTDOWN_GRACE};
pub use codec::{InboundMessage, NoopCodec, WireCodec};
pub use command::{OutgoingCommand, PublishCommand};
pub use config::{ConnectTarget, QoS, SessionConfig};
pub use event::{EventPump, InboundEvent};
pub use state::SessionState;
