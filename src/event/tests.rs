use super::*;
use crate::codec::InboundMessage;
use std::cell::RefCell;
use std::rc::Rc;

fn message(topic: &str, payload: &str) -> InboundEvent {
    InboundEvent::MessageReceived(InboundMessage {
        topic: topic.to_string(),
        payload: payload.as_bytes().to_vec(),
    })
}

#[test]
fn retire_flips_exactly_once() {
    let token = OwnerToken::new();
    let clone = token.clone();
    assert!(token.is_alive());
    assert!(token.retire(), "first retire reports the flip");
    assert!(!token.retire(), "second retire is a no-op");
    assert!(!clone.is_alive(), "clones observe the flip");
}

#[test]
fn pump_delivers_events_in_worker_order() {
    let owner = OwnerToken::new();
    let (dispatcher, mut pump) = event_channel(owner);

    let log = Rc::new(RefCell::new(Vec::new()));
    let connected_log = log.clone();
    pump.on_connected(move || connected_log.borrow_mut().push("connected".to_string()));
    let message_log = log.clone();
    pump.on_message(move |topic, payload| {
        message_log
            .borrow_mut()
            .push(format!("{topic}={}", String::from_utf8_lossy(payload)));
    });
    let disconnect_log = log.clone();
    pump.on_disconnected(move |reason| disconnect_log.borrow_mut().push(format!("down:{reason}")));

    dispatcher.notify(InboundEvent::Connected);
    dispatcher.notify(message("sensors/a", "1"));
    dispatcher.notify(message("sensors/a", "2"));
    dispatcher.notify(InboundEvent::Disconnected {
        reason: "peer closed".to_string(),
    });

    assert_eq!(pump.pump_events(), 4);
    assert_eq!(
        *log.borrow(),
        vec![
            "connected".to_string(),
            "sensors/a=1".to_string(),
            "sensors/a=2".to_string(),
            "down:peer closed".to_string(),
        ]
    );
    assert_eq!(pump.pump_events(), 0, "nothing queued second time around");
}

#[test]
fn dispatcher_drops_events_once_owner_is_dead() {
    let owner = OwnerToken::new();
    let (dispatcher, mut pump) = event_channel(owner.clone());
    owner.retire();

    dispatcher.notify(InboundEvent::Connected);
    assert_eq!(pump.pump_events(), 0);
}

#[test]
fn pump_discards_queued_events_when_owner_dies_in_between() {
    // Worker notifies, owner is destroyed, then the foreground handoff
    // runs. No callback may fire.
    let owner = OwnerToken::new();
    let (dispatcher, mut pump) = event_channel(owner.clone());

    let fired = Rc::new(RefCell::new(0));
    let counter = fired.clone();
    pump.on_connected(move || *counter.borrow_mut() += 1);

    dispatcher.notify(InboundEvent::Connected);
    owner.retire();

    assert_eq!(pump.pump_events(), 0);
    assert_eq!(*fired.borrow(), 0);
}

#[test]
fn events_without_registered_callbacks_still_count_as_delivered() {
    let owner = OwnerToken::new();
    let (dispatcher, mut pump) = event_channel(owner);
    dispatcher.notify(InboundEvent::Connected);
    assert_eq!(pump.pump_events(), 1);
}

#[test]
fn inbound_events_serialize_for_journaling() {
    let event = message("state/door", "open");
    let json = serde_json::to_string(&event).expect("serialize event");
    let back: InboundEvent = serde_json::from_str(&json).expect("deserialize event");
    assert_eq!(back, event);
}
