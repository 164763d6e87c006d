//! Helpers shared by service unit tests.

use axum::extract::ws::Message;
use uuid::Uuid;

use crate::{
    dto::ws::ServerMessage,
    state::{Connection, DeliveryPolicy, Outbound, OutboundQueues},
};

/// Unbound connection with a roomy relay queue, plus its queues.
pub(crate) fn client() -> (Connection, OutboundQueues) {
    client_with(8, DeliveryPolicy::Volatile)
}

/// Unbound connection with the given relay capacity and policy.
pub(crate) fn client_with(
    relay_capacity: usize,
    policy: DeliveryPolicy,
) -> (Connection, OutboundQueues) {
    let (outbound, queues) = Outbound::channel(Uuid::new_v4(), relay_capacity, policy);
    (Connection::new(outbound), queues)
}

fn decode(frame: Message) -> ServerMessage {
    match frame {
        Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
        other => panic!("unexpected frame {other:?}"),
    }
}

/// Next queued notification, if any.
pub(crate) fn next_event(queues: &mut OutboundQueues) -> Option<ServerMessage> {
    queues.control.try_recv().ok().map(decode)
}

/// Next queued relayed message, if any.
pub(crate) fn next_relayed(queues: &mut OutboundQueues) -> Option<ServerMessage> {
    queues.relay.try_recv().ok().map(decode)
}

/// Drain every queued notification.
pub(crate) fn drain_events(queues: &mut OutboundQueues) -> Vec<ServerMessage> {
    std::iter::from_fn(|| next_event(queues)).collect()
}
