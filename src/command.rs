//! Outgoing command queues and the wake signal that bounds command latency.
//!
//! Three MPSC queues feed the worker: control (connect/disconnect), transfers
//! (publishes), and subscriptions. Order is FIFO within each queue only; the
//! worker drains them non-blockingly each cycle. Every enqueue rings the wake
//! signal so a sleeping worker reacts immediately instead of waiting out its
//! poll interval.

use crate::config::{ConnectTarget, QoS, SessionConfig};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tracing::debug;

/// A request enqueued by the foreground thread. Immutable once enqueued.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutgoingCommand {
    Connect {
        target: ConnectTarget,
        /// Owned snapshot taken at enqueue time; later setter calls on the
        /// client never touch an in-flight connect.
        config: SessionConfig,
    },
    Disconnect {
        force: bool,
    },
    Publish(PublishCommand),
    Subscribe {
        filter: String,
        qos: QoS,
    },
    Unsubscribe {
        filter: String,
    },
}

/// An outgoing application message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishCommand {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

/// Condvar-backed event the foreground rings whenever there is work, and the
/// worker waits on with a bounded timeout so housekeeping still runs when
/// idle.
#[derive(Debug, Default)]
pub(crate) struct WakeSignal {
    pending: Mutex<bool>,
    condvar: Condvar,
}

impl WakeSignal {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Ring the signal. Cheap, safe from any thread, never blocks.
    pub(crate) fn notify(&self) {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *pending = true;
        self.condvar.notify_one();
    }

    /// Wait until rung or `timeout` elapses. Returns true when rung. A ring
    /// that arrived before the wait starts is not lost.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !*pending {
            let (guard, _) = self
                .condvar
                .wait_timeout(pending, timeout)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            pending = guard;
        }
        let rung = *pending;
        *pending = false;
        rung
    }
}

/// Foreground half: routes commands onto the right queue and rings the wake
/// signal. Safe to use before the worker starts and after shutdown; commands
/// enqueued after shutdown are simply never processed.
#[derive(Clone)]
pub(crate) struct CommandSender {
    control_tx: Sender<OutgoingCommand>,
    transfer_tx: Sender<OutgoingCommand>,
    subscription_tx: Sender<OutgoingCommand>,
    wake: Arc<WakeSignal>,
}

impl CommandSender {
    pub(crate) fn enqueue(&self, command: OutgoingCommand) {
        let queue = match &command {
            OutgoingCommand::Connect { .. } | OutgoingCommand::Disconnect { .. } => {
                &self.control_tx
            }
            OutgoingCommand::Publish(_) => &self.transfer_tx,
            OutgoingCommand::Subscribe { .. } | OutgoingCommand::Unsubscribe { .. } => {
                &self.subscription_tx
            }
        };
        if queue.send(command).is_err() {
            // Worker already gone; post-shutdown enqueues are a no-op.
            debug!("command enqueued after worker exit, dropping");
        }
        self.wake.notify();
    }
}

/// Worker half: non-blocking drains, one consumer.
pub(crate) struct CommandReceiver {
    control_rx: Receiver<OutgoingCommand>,
    transfer_rx: Receiver<OutgoingCommand>,
    subscription_rx: Receiver<OutgoingCommand>,
}

impl CommandReceiver {
    pub(crate) fn next_control(&self) -> Option<OutgoingCommand> {
        self.control_rx.try_recv().ok()
    }

    pub(crate) fn next_transfer(&self) -> Option<OutgoingCommand> {
        self.transfer_rx.try_recv().ok()
    }

    pub(crate) fn next_subscription(&self) -> Option<OutgoingCommand> {
        self.subscription_rx.try_recv().ok()
    }

    /// Discard everything still queued. Used on forced disconnect and after a
    /// send failure, where pending commands are dropped wholesale.
    pub(crate) fn clear_pending(&self) -> usize {
        let mut dropped = 0;
        while self.transfer_rx.try_recv().is_ok() {
            dropped += 1;
        }
        while self.subscription_rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

/// Build the connected sender/receiver halves sharing `wake`.
pub(crate) fn queues(wake: Arc<WakeSignal>) -> (CommandSender, CommandReceiver) {
    let (control_tx, control_rx) = unbounded();
    let (transfer_tx, transfer_rx) = unbounded();
    let (subscription_tx, subscription_rx) = unbounded();
    (
        CommandSender {
            control_tx,
            transfer_tx,
            subscription_tx,
            wake,
        },
        CommandReceiver {
            control_rx,
            transfer_rx,
            subscription_rx,
        },
    )
}
