//! Foreground-facing session client and its lifecycle controller.
//!
//! Every method here is cheap and non-blocking: commands are enqueued for the
//! worker thread and the only bounded wait in the whole API is the shutdown
//! grace period. The client must be torn down (explicitly via [`shutdown`]
//! or implicitly on drop) before the embedder discards its callbacks; the
//! owner token retired during teardown guarantees no callback can race the
//! owner's destruction.
//!
//! [`shutdown`]: SessionClient::shutdown

use crate::codec::WireCodec;
use crate::command::{self, CommandSender, OutgoingCommand, PublishCommand, WakeSignal};
use crate::config::{ConnectTarget, QoS, SessionConfig};
use crate::event::{event_channel, EventPump, OwnerToken};
use crate::state::SessionState;
use crate::worker::{SessionWorker, WorkerShared};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError};
use std::mem;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// How long `shutdown` waits for the worker to exit on its own before
/// detaching it.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

enum Lifecycle {
    /// Worker built but no thread yet; commands queue up in the meantime.
    Idle {
        worker: SessionWorker,
        done_rx: Receiver<()>,
    },
    Running {
        handle: JoinHandle<()>,
        done_rx: Receiver<()>,
    },
    /// Thread creation failed; every subsequent connect is rejected.
    Failed,
    Finished,
}

/// A broker session: synchronous API on the caller's thread, all I/O on one
/// dedicated background thread, events delivered through the [`EventPump`]
/// returned alongside the client.
pub struct SessionClient {
    shared: Arc<WorkerShared>,
    commands: CommandSender,
    config: Mutex<SessionConfig>,
    owner: OwnerToken,
    lifecycle: Mutex<Lifecycle>,
}

impl SessionClient {
    /// Build a client around the given codec. The returned pump belongs on
    /// the foreground loop; events queue up until it is drained.
    pub fn new(codec: Box<dyn WireCodec>) -> (Self, EventPump) {
        let wake = Arc::new(WakeSignal::new());
        let (commands, receiver) = command::queues(wake.clone());
        let shared = Arc::new(WorkerShared::new(wake));
        let owner = OwnerToken::new();
        let (dispatcher, pump) = event_channel(owner.clone());
        let (done_tx, done_rx) = unbounded();
        let worker = SessionWorker::new(shared.clone(), receiver, dispatcher, codec, done_tx);
        (
            Self {
                shared,
                commands,
                config: Mutex::new(SessionConfig::default()),
                owner,
                lifecycle: Mutex::new(Lifecycle::Idle { worker, done_rx }),
            },
            pump,
        )
    }

    /// Start the worker thread. Idempotent; returns false only when thread
    /// creation failed (now or previously) or the client is already shut
    /// down.
    pub fn start(&self) -> bool {
        let mut lifecycle = self
            .lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match mem::replace(&mut *lifecycle, Lifecycle::Failed) {
            Lifecycle::Idle { worker, done_rx } => {
                let spawned = thread::Builder::new()
                    .name("brokerlink-session".to_string())
                    .spawn(move || worker.run());
                match spawned {
                    Ok(handle) => {
                        *lifecycle = Lifecycle::Running { handle, done_rx };
                        true
                    }
                    Err(err) => {
                        warn!("failed to start session worker: {err}");
                        false
                    }
                }
            }
            running @ Lifecycle::Running { .. } => {
                *lifecycle = running;
                true
            }
            Lifecycle::Failed => false,
            Lifecycle::Finished => {
                *lifecycle = Lifecycle::Finished;
                false
            }
        }
    }

    /// Request a connection. Accepted unless the worker could not be
    /// started; the actual network outcome arrives asynchronously as a
    /// `Connected` or `Disconnected{reason}` event. While already connected
    /// this only retargets the next establish cycle.
    pub fn connect(&self, host: &str, port: u16, use_tls: bool) -> bool {
        if !self.start() {
            return false;
        }
        let config = self
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        self.commands.enqueue(OutgoingCommand::Connect {
            target: ConnectTarget {
                host: host.to_string(),
                port,
                use_tls,
            },
            config,
        });
        true
    }

    /// Request a disconnect. Idempotent: while already down this is a no-op
    /// and produces no further notification. `force` drops queued commands
    /// instead of flushing them first.
    pub fn disconnect(&self, force: bool) {
        self.commands.enqueue(OutgoingCommand::Disconnect { force });
    }

    /// Queue a message for publication. Returns whether the request was
    /// accepted locally; delivery happens on the worker once connected.
    pub fn publish(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        qos: u8,
        retain: bool,
    ) -> bool {
        if topic.is_empty() {
            return false;
        }
        self.commands
            .enqueue(OutgoingCommand::Publish(PublishCommand {
                topic: topic.to_string(),
                payload: payload.into(),
                qos: QoS::from_level(qos),
                retain,
            }));
        true
    }

    pub fn subscribe(&self, filter: &str, qos: u8) -> bool {
        if filter.is_empty() {
            return false;
        }
        self.commands.enqueue(OutgoingCommand::Subscribe {
            filter: filter.to_string(),
            qos: QoS::from_level(qos),
        });
        true
    }

    pub fn unsubscribe(&self, filter: &str) -> bool {
        if filter.is_empty() {
            return false;
        }
        self.commands.enqueue(OutgoingCommand::Unsubscribe {
            filter: filter.to_string(),
        });
        true
    }

    /// Set credentials used by the codec's handshake. Applies to connects
    /// issued after this call; an in-flight connect keeps its snapshot.
    pub fn set_credentials(&self, username: &str, password: &str) {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .set_credentials(username, password);
    }

    pub fn set_client_id(&self, client_id: &str) {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .client_id = Some(client_id.to_string());
    }

    /// Keep-alive interval in seconds; 0 disables the ping.
    pub fn set_keep_alive(&self, seconds: u64) {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keep_alive_secs = seconds;
    }

    /// Lock-free read of the last state the worker published.
    pub fn current_state(&self) -> SessionState {
        self.shared.state.load()
    }

    pub fn is_connected(&self) -> bool {
        self.current_state().is_connected()
    }

    /// Stop the worker. Retires the owner token first (so no callback can
    /// fire past this point), then waits up to [`SHUTDOWN_GRACE`] for the
    /// loop's exit acknowledgment. A worker stuck in blocking I/O is
    /// detached: logged, never an error for the caller. Safe to call any
    /// number of times.
    pub fn shutdown(&self) {
        if self.owner.retire() {
            debug!("owner retired; event delivery disarmed");
        }
        self.shared.stop.store(true, Ordering::Release);
        self.shared.wake.notify();

        let mut lifecycle = self
            .lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match mem::replace(&mut *lifecycle, Lifecycle::Finished) {
            Lifecycle::Running { handle, done_rx } => match done_rx.recv_timeout(SHUTDOWN_GRACE) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    if handle.join().is_err() {
                        warn!("session worker panicked during shutdown");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(
                        grace = ?SHUTDOWN_GRACE,
                        "session worker did not stop in time, detaching"
                    );
                    drop(handle);
                }
            },
            // Never started: the codec is dropped without ever having run.
            Lifecycle::Idle { .. } | Lifecycle::Failed | Lifecycle::Finished => {}
        }
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}
