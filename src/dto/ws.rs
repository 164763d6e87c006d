use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error as _, Unexpected},
};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    error::{ErrorKind, JoinError},
    state::{SessionCode, Slot},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
/// Messages accepted from WebSocket clients, framed as `{"event": ..., "data": ...}`.
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create a session and become its host.
    #[serde(alias = "join_host")]
    RequestHost,
    /// Join the session with the given code as a controller.
    #[serde(alias = "join_controller")]
    RequestController(String),
    /// Button transition to relay to the rest of the session.
    Input(InputEvent),
    /// Ask the host to reset the running game.
    ResetGame,
    /// Any event name this server does not handle.
    #[serde(other)]
    Unknown,
}

/// Failure to turn a text frame into a [`ClientMessage`].
#[derive(Debug, Error)]
pub enum InboundError {
    /// Not valid JSON or not a known message shape.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// Well-formed but out of range.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl ClientMessage {
    /// Parse and validate a text frame.
    pub fn from_json_str(text: &str) -> Result<Self, InboundError> {
        let message: Self = serde_json::from_str(text)?;
        if let Self::Input(input) = &message {
            input.validate()?;
        }
        Ok(message)
    }
}

/// Direction of a button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ButtonTransition {
    /// Button pressed.
    Down,
    /// Button released.
    Up,
}

impl<'de> Deserialize<'de> for ButtonTransition {
    /// Accepts `"down"`/`"up"` as well as the compact `1`/`0` form sent by phones.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Named(String),
            Flag(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Named(name) => match name.as_str() {
                "down" => Ok(Self::Down),
                "up" => Ok(Self::Up),
                other => Err(D::Error::unknown_variant(other, &["down", "up"])),
            },
            Raw::Flag(1) => Ok(Self::Down),
            Raw::Flag(0) => Ok(Self::Up),
            Raw::Flag(other) => Err(D::Error::invalid_value(
                Unexpected::Unsigned(other),
                &"1 (down) or 0 (up)",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
/// Button state change reported by a client.
pub struct InputEvent {
    /// Opaque button symbol, e.g. `A` or `LEFT`.
    #[serde(alias = "b")]
    #[validate(length(min = 1, max = 16))]
    pub button: String,
    /// Press or release.
    #[serde(alias = "t")]
    pub transition: ButtonTransition,
    /// Sender's clock in milliseconds, used by receivers to estimate latency.
    #[serde(alias = "ts", default, skip_serializing_if = "Option::is_none")]
    pub origin_timestamp: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
/// Messages pushed to WebSocket clients, framed as `{"event": ..., "data": ...}`.
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent to a new host with its session code.
    SessionCreated(SessionCreated),
    /// Outcome of a controller join request.
    ControllerJoined(JoinOutcome),
    /// Sent to the host when a controller takes a slot.
    PlayerJoined(PlayerJoined),
    /// Sent to the remaining parties when a controller leaves.
    PlayerLeft(PlayerLeft),
    /// Relayed button transition.
    Input(RelayedInput),
    /// Relayed reset command from player 1.
    ResetGame,
    /// Terminal notice that the session's host is gone.
    HostDisconnected,
    /// Rejected frame or role request.
    Error(ErrorNotice),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
/// Payload of `session_created`.
pub struct SessionCreated {
    /// Six digit session code.
    pub code: SessionCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
/// Payload of `controller_joined`.
pub struct JoinOutcome {
    /// Whether the controller is now seated.
    pub success: bool,
    /// Granted slot on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<u8>)]
    pub slot: Option<Slot>,
    /// Failure category otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

impl JoinOutcome {
    /// Successful join at `slot`.
    pub fn seated(slot: Slot) -> Self {
        Self {
            success: true,
            slot: Some(slot),
            error: None,
        }
    }

    /// Refused join.
    pub fn rejected(err: &JoinError) -> Self {
        Self {
            success: false,
            slot: None,
            error: Some(err.kind()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
/// Payload of `player_joined`.
pub struct PlayerJoined {
    /// Opaque identifier of the controller's connection.
    pub peer_id: Uuid,
    /// Slot the controller took.
    #[schema(value_type = u8)]
    pub slot: Slot,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
/// Payload of `player_left`.
pub struct PlayerLeft {
    /// Slot that became free.
    #[schema(value_type = u8)]
    pub slot: Slot,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
/// Payload of a relayed `input`.
pub struct RelayedInput {
    /// Sender's slot; absent when the host sent it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<u8>)]
    pub slot: Option<Slot>,
    /// The transition as sent.
    #[serde(flatten)]
    pub input: InputEvent,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
/// Payload of `error`.
pub struct ErrorNotice {
    /// Category.
    pub kind: ErrorKind,
    /// Human readable detail.
    pub message: String,
}

impl ErrorNotice {
    /// Notice for a malformed or disallowed request.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::InvalidRequest,
            message: message.into(),
        }
    }
}
