//! The dedicated session worker thread.
//!
//! One worker per client. The loop owns the codec (and with it the
//! connection) exclusively: wait on the wake signal with a bounded timeout,
//! drain control commands, establish when disconnected with a target set,
//! push queued publishes and subscriptions in FIFO order, poll for inbound
//! traffic, and run keep-alive housekeeping. I/O failures degrade the session
//! to `Disconnected` and drop what was queued; they never kill the loop.


use crate::codec::WireCodec;
use crate::command::{CommandReceiver, OutgoingCommand, WakeSignal};
use crate::config::{ConnectTarget, SessionConfig};
use crate::event::{EventDispatcher, InboundEvent};
use crate::state::{SessionState, StateCell};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Upper bound on one idle wait; housekeeping (keep-alive, reconnect) runs at
/// least this often even with no commands arriving.
pub(crate) const IDLE_WAIT: Duration = Duration::from_millis(100);

/// State shared between the foreground handles and the worker thread.
pub(crate) struct WorkerShared {
    pub(crate) stop: AtomicBool,
    pub(crate) state: StateCell,
    pub(crate) wake: Arc<WakeSignal>,
}

impl WorkerShared {
    pub(crate) fn new(wake: Arc<WakeSignal>) -> Self {
        Self {
            stop: AtomicBool::new(false),
            state: StateCell::new(),
            wake,
        }
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

pub(crate) struct SessionWorker {
    shared: Arc<WorkerShared>,
    commands: CommandReceiver,
    dispatcher: EventDispatcher,
    codec: Box<dyn WireCodec>,
    /// Where the next establish attempt goes. `None` until the first connect
    /// command, cleared again by disconnect.
    target: Option<ConnectTarget>,
    /// Private copy of the session config, replaced wholesale with each
    /// connect command. Foreground setters never touch this.
    config: SessionConfig,
    last_activity: Instant,
    /// Exit acknowledgment for the bounded shutdown wait.
    done_tx: Sender<()>,
}

impl SessionWorker {
    pub(crate) fn new(
        shared: Arc<WorkerShared>,
        commands: CommandReceiver,
        dispatcher: EventDispatcher,
        codec: Box<dyn WireCodec>,
        done_tx: Sender<()>,
    ) -> Self {
        Self {
            shared,
            commands,
            dispatcher,
            codec,
            target: None,
            config: SessionConfig::default(),
            last_activity: Instant::now(),
            done_tx,
        }
    }

    /// Thread entry point. Runs until the stop flag is observed.
    pub(crate) fn run(mut self) {
        debug!("session worker started");
        loop {
            if self.shared.stop_requested() {
                break;
            }
            self.shared.wake.wait_timeout(IDLE_WAIT);
            if self.shared.stop_requested() {
                break;
            }
            self.tick();
        }
        self.finish();
    }

    /// One loop iteration. Split out so tests can drive the worker
    /// deterministically without a thread.
    fn tick(&mut self) {
        self.drain_control();
        self.connect_if_needed();
        self.drain_transfers();
        self.drain_subscriptions();
        self.poll_inbound();
        self.keep_alive_tick();
    }

    fn drain_control(&mut self) {
        while let Some(command) = self.commands.next_control() {
            match command {
                OutgoingCommand::Connect { target, config } => {
                    // Passive retarget: while connected this only updates the
                    // target for the next establish cycle, it never tears
                    // down the live connection.
                    debug!(host = %target.host, port = target.port, "connect target updated");
                    self.target = Some(target);
                    self.config = config;
                }
                OutgoingCommand::Disconnect { force } => self.handle_disconnect(force),
                other => debug!(?other, "unexpected command on control queue"),
            }
        }
    }

    fn handle_disconnect(&mut self, force: bool) {
        self.target = None;
        if self.shared.state.load() != SessionState::Connected {
            // Already down (or a pending connect just got cancelled by
            // clearing the target). No duplicate notification.
            return;
        }
        self.shared.state.publish(SessionState::Disconnecting);
        if force {
            let dropped = self.commands.clear_pending();
            if dropped > 0 {
                debug!(dropped, "forced disconnect dropped queued commands");
            }
        } else {
            self.flush_transfers();
            self.commands.clear_pending();
        }
        self.codec.teardown();
        self.shared.state.publish(SessionState::Disconnected);
        self.dispatcher.notify(InboundEvent::Disconnected {
            reason: "disconnect requested".to_string(),
        });
    }

    /// Best-effort drain of already-queued publishes before a graceful
    /// disconnect. A failing send just ends the flush; teardown follows
    /// either way.
    fn flush_transfers(&mut self) {
        while let Some(command) = self.commands.next_transfer() {
            let OutgoingCommand::Publish(publish) = command else {
                continue;
            };
            if self.codec.send_publish(&publish).is_err() {
                break;
            }
        }
    }

    fn connect_if_needed(&mut self) {
        if self.shared.state.load() != SessionState::Disconnected {
            return;
        }
        let Some(target) = self.target.clone() else {
            return;
        };
        self.shared.state.publish(SessionState::Connecting);
        debug!(host = %target.host, port = target.port, "establishing session");
        match self.codec.establish(&target, &self.config) {
            Ok(()) => {
                // Shutdown may have raced a slow handshake; a stopped worker
                // must never surface Connected.
                if self.shared.stop_requested() {
                    self.codec.teardown();
                    self.shared.state.publish(SessionState::Disconnected);
                    return;
                }
                self.shared.state.publish(SessionState::Connected);
                self.last_activity = Instant::now();
                self.dispatcher.notify(InboundEvent::Connected);
            }
            Err(err) => {
                self.shared.state.publish(SessionState::Disconnected);
                warn!(host = %target.host, "connect failed: {err:#}");
                // Target stays set; the next cycle retries. Backing off or
                // giving up is the owner's call, via disconnect.
                self.dispatcher.notify(InboundEvent::Disconnected {
                    reason: format!("connect failed: {err:#}"),
                });
            }
        }
    }

    fn drain_transfers(&mut self) {
        if self.shared.state.load() != SessionState::Connected {
            return;
        }
        while let Some(command) = self.commands.next_transfer() {
            let OutgoingCommand::Publish(publish) = command else {
                continue;
            };
            if let Err(err) = self.codec.send_publish(&publish) {
                self.fail_session(format!("publish failed: {err:#}"));
                return;
            }
            self.last_activity = Instant::now();
        }
    }

    fn drain_subscriptions(&mut self) {
        if self.shared.state.load() != SessionState::Connected {
            return;
        }
        while let Some(command) = self.commands.next_subscription() {
            let result = match &command {
                OutgoingCommand::Subscribe { filter, qos } => {
                    self.codec.send_subscribe(filter, *qos)
                }
                OutgoingCommand::Unsubscribe { filter } => self.codec.send_unsubscribe(filter),
                other => {
                    debug!(?other, "unexpected command on subscription queue");
                    continue;
                }
            };
            if let Err(err) = result {
                self.fail_session(format!("subscription change failed: {err:#}"));
                return;
            }
            self.last_activity = Instant::now();
        }
    }

    fn poll_inbound(&mut self) {
        if self.shared.state.load() != SessionState::Connected {
            return;
        }
        loop {
            match self.codec.poll_receive() {
                Ok(Some(message)) => {
                    self.last_activity = Instant::now();
                    self.dispatcher
                        .notify(InboundEvent::MessageReceived(message));
                }
                Ok(None) => break,
                Err(err) => {
                    self.fail_session(format!("receive failed: {err:#}"));
                    break;
                }
            }
        }
    }

    fn keep_alive_tick(&mut self) {
        if self.shared.state.load() != SessionState::Connected {
            return;
        }
        let interval = self.config.keep_alive_secs;
        if interval == 0 {
            return;
        }
        if self.last_activity.elapsed() < Duration::from_secs(interval) {
            return;
        }
        match self.codec.ping() {
            Ok(()) => self.last_activity = Instant::now(),
            Err(err) => self.fail_session(format!("keep-alive ping failed: {err:#}")),
        }
    }

    /// Mid-session I/O failure: tear down, drop what was queued, publish the
    /// degraded state, and emit exactly one notification. The loop stays
    /// alive; with a target still set the next cycle reconnects.
    fn fail_session(&mut self, reason: String) {
        self.codec.teardown();
        let dropped = self.commands.clear_pending();
        if dropped > 0 {
            debug!(dropped, "dropped queued commands after failure");
        }
        self.shared.state.publish(SessionState::Disconnected);
        warn!(reason, "session degraded");
        self.dispatcher.notify(InboundEvent::Disconnected { reason });
    }

    fn finish(mut self) {
        if self.shared.state.load() == SessionState::Connected {
            self.codec.teardown();
        }
        self.shared.state.publish(SessionState::Disconnected);
        debug!("session worker exiting");
        // Receiver may already be gone when shutdown gave up waiting.
        let _ = self.done_tx.send(());
    }
}
