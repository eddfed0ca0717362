//! Dispatcher (worker side) and pump (foreground side) of the event channel.

use super::{InboundEvent, OwnerToken};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::debug;

type ConnectedCallback = Box<dyn FnMut()>;
type DisconnectedCallback = Box<dyn FnMut(&str)>;
type MessageCallback = Box<dyn FnMut(&str, &[u8])>;

pub(crate) fn event_channel(owner: OwnerToken) -> (EventDispatcher, EventPump) {
    let (tx, rx) = unbounded();
    (
        EventDispatcher {
            tx,
            owner: owner.clone(),
        },
        EventPump::new(rx, owner),
    )
}

/// Worker-side handle. `notify` is cheap, never blocks, and never invokes
/// foreground code; it only posts onto the channel.
pub(crate) struct EventDispatcher {
    tx: Sender<InboundEvent>,
    owner: OwnerToken,
}

impl EventDispatcher {
    pub(crate) fn notify(&self, event: InboundEvent) {
        if !self.owner.is_alive() {
            debug!(?event, "owner gone, dropping event");
            return;
        }
        // A closed channel means the pump was dropped; nothing left to notify.
        let _ = self.tx.send(event);
    }
}

/// Foreground-side handle: holds the registered callbacks and delivers queued
/// events, in worker order, when the embedder's own loop calls
/// [`pump_events`](Self::pump_events).
pub struct EventPump {
    rx: Receiver<InboundEvent>,
    owner: OwnerToken,
    on_connected: Option<ConnectedCallback>,
    on_disconnected: Option<DisconnectedCallback>,
    on_message: Option<MessageCallback>,
}

impl EventPump {
    fn new(rx: Receiver<InboundEvent>, owner: OwnerToken) -> Self {
        Self {
            rx,
            owner,
            on_connected: None,
            on_disconnected: None,
            on_message: None,
        }
    }

    pub fn on_connected(&mut self, callback: impl FnMut() + 'static) {
        self.on_connected = Some(Box::new(callback));
    }

    pub fn on_disconnected(&mut self, callback: impl FnMut(&str) + 'static) {
        self.on_disconnected = Some(Box::new(callback));
    }

    pub fn on_message(&mut self, callback: impl FnMut(&str, &[u8]) + 'static) {
        self.on_message = Some(Box::new(callback));
    }

    /// Drain every queued event and run the matching callbacks. Returns the
    /// number of events delivered. Liveness is re-checked per event: if the
    /// owner died between the worker's notify and this call, the remaining
    /// events are discarded without touching any callback.
    pub fn pump_events(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(event) = self.rx.try_recv() {
            if !self.owner.is_alive() {
                debug!(?event, "owner gone, discarding queued event");
                continue;
            }
            match event {
                InboundEvent::Connected => {
                    if let Some(callback) = self.on_connected.as_mut() {
                        callback();
                    }
                }
                InboundEvent::Disconnected { reason } => {
                    if let Some(callback) = self.on_disconnected.as_mut() {
                        callback(&reason);
                    }
                }
                InboundEvent::MessageReceived(message) => {
                    if let Some(callback) = self.on_message.as_mut() {
                        callback(&message.topic, &message.payload);
                    }
                }
            }
            delivered += 1;
        }
        delivered
    }
}
