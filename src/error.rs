use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::state::Slot;

/// Error categories reported to WebSocket clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum ErrorKind {
    /// No active session uses the requested code.
    SessionNotFound,
    /// Both controller slots are occupied.
    RoomFull,
    /// Malformed frame or a role request from an already bound connection.
    InvalidRequest,
    /// Privileged command from a connection not allowed to issue it.
    UnauthorizedCommand,
}

/// Reasons a controller join is refused. Reported synchronously, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    /// The code does not belong to an active session.
    #[error("session not found")]
    SessionNotFound,
    /// Both slots are taken.
    #[error("room full")]
    RoomFull,
    /// The request itself is malformed or not allowed in the connection's role.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl JoinError {
    /// Wire category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            JoinError::SessionNotFound => ErrorKind::SessionNotFound,
            JoinError::RoomFull => ErrorKind::RoomFull,
            JoinError::InvalidRequest(_) => ErrorKind::InvalidRequest,
        }
    }
}

/// Reasons a relayed message goes nowhere. None of these are reported to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The sender is not bound to a session.
    #[error("connection is not bound to a session")]
    NotBound,
    /// The sender's session has been retired.
    #[error("session is no longer active")]
    SessionClosed,
    /// The sender may not issue this command.
    #[error("command not allowed from {origin}")]
    UnauthorizedCommand {
        /// Who attempted the command.
        origin: CommandOrigin,
    },
}

/// Origin of a rejected privileged command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOrigin {
    /// The session host.
    Host,
    /// A controller seated at the given slot.
    Controller(Slot),
}

impl std::fmt::Display for CommandOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandOrigin::Host => f.write_str("host"),
            CommandOrigin::Controller(slot) => write!(f, "controller {slot}"),
        }
    }
}

/// Errors that can occur in service layer operations backing HTTP routes.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// The join QR code could not be generated.
    #[error("unable to render QR code: {0}")]
    QrCode(#[from] qrcode::types::QrError),
    /// Filesystem access failed.
    #[error("{context}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },
}

impl ServiceError {
    /// Wrap an IO failure with a short description of the operation.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        ServiceError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest(format!("validation failed: {}", err))
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
            ServiceError::QrCode(err) => AppError::Internal(err.to_string()),
            ServiceError::Io { context, .. } => AppError::Internal(context),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
