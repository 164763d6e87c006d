//! Per-connection outbound queues and the delivery policy applied to relayed traffic.

use axum::extract::ws::Message;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::warn;
use uuid::Uuid;

use crate::dto::ws::ServerMessage;

/// Identifier of one physical channel, valid for the channel's lifetime only.
pub type ConnectionId = Uuid;

/// How relayed input is handed to a recipient's writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryPolicy {
    /// Fire-and-forget: drop the frame when the recipient's relay queue is full.
    #[default]
    Volatile,
    /// Route relayed frames through the unbounded control queue.
    Reliable,
}

/// Outcome of handing a single relayed frame to a recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The frame was queued for the writer.
    Queued,
    /// The recipient's relay queue was saturated and the frame was discarded.
    Dropped,
    /// The recipient's writer is gone.
    Closed,
}

/// Returned when a reliable send targets a connection whose writer has exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("connection closed")]
pub struct ConnectionClosed;

/// Cloneable handle used to push frames to a connected client.
#[derive(Debug, Clone)]
pub struct Outbound {
    id: ConnectionId,
    control: mpsc::UnboundedSender<Message>,
    relay: mpsc::Sender<Message>,
    policy: DeliveryPolicy,
}

/// Receiving halves drained by the connection's writer task.
#[derive(Debug)]
pub struct OutboundQueues {
    /// Reliable frames: notifications, pongs, close frames.
    pub control: mpsc::UnboundedReceiver<Message>,
    /// Droppable relayed input.
    pub relay: mpsc::Receiver<Message>,
}

impl Outbound {
    /// Build a handle and its queues. `relay_capacity` bounds the droppable queue.
    pub fn channel(
        id: ConnectionId,
        relay_capacity: usize,
        policy: DeliveryPolicy,
    ) -> (Self, OutboundQueues) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (relay_tx, relay_rx) = mpsc::channel(relay_capacity.max(1));
        let outbound = Self {
            id,
            control: control_tx,
            relay: relay_tx,
            policy,
        };
        let queues = OutboundQueues {
            control: control_rx,
            relay: relay_rx,
        };
        (outbound, queues)
    }

    /// Connection this handle writes to.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Serialize and reliably queue a notification.
    ///
    /// Serialization failures are logged and swallowed: they are programming errors, not
    /// connection state, and retrying would not help.
    pub fn send(&self, event: &ServerMessage) -> Result<(), ConnectionClosed> {
        match encode_event(event) {
            Ok(frame) => self.send_frame(frame),
            Err(err) => {
                warn!(error = %err, "failed to serialize message `{event:?}` (permanent error, not retrying)");
                Ok(())
            }
        }
    }

    /// Reliably queue an already encoded frame.
    pub fn send_frame(&self, frame: Message) -> Result<(), ConnectionClosed> {
        self.control.send(frame).map_err(|_| ConnectionClosed)
    }

    /// Hand a relayed frame over according to the configured [`DeliveryPolicy`].
    ///
    /// Never waits: a saturated queue yields [`Delivery::Dropped`].
    pub fn relay(&self, frame: Message) -> Delivery {
        match self.policy {
            DeliveryPolicy::Reliable => match self.send_frame(frame) {
                Ok(()) => Delivery::Queued,
                Err(ConnectionClosed) => Delivery::Closed,
            },
            DeliveryPolicy::Volatile => match self.relay.try_send(frame) {
                Ok(()) => Delivery::Queued,
                Err(TrySendError::Full(_)) => Delivery::Dropped,
                Err(TrySendError::Closed(_)) => Delivery::Closed,
            },
        }
    }
}

/// Encode a server event into a WebSocket text frame.
pub fn encode_event(event: &ServerMessage) -> Result<Message, serde_json::Error> {
    let payload = serde_json::to_string(event)?;
    Ok(Message::Text(payload.into()))
}
