//! Role state machine of a single connection.
//!
//! ```text
//! Unbound ──BindHost──────────▶ Host
//!    │
//!    └────BindController──────▶ Controller(slot)
//!
//! any ──ChannelClosed──▶ Disconnected (terminal)
//! ```
//!
//! The pending stage of a controller join has no stored state: the registry seats the
//! controller atomically and only then is `BindController` applied with the granted slot.

use std::fmt;

use thiserror::Error;

use crate::state::{
    outbound::{ConnectionId, Outbound},
    session::SessionCode,
    slots::Slot,
};

/// Role a connection currently plays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRole {
    /// Connected but not yet attached to a session.
    Unbound,
    /// Owner of the session identified by `code`.
    Host {
        /// Session hosted by this connection.
        code: SessionCode,
    },
    /// Controller seated in `slot` of the session identified by `code`.
    Controller {
        /// Session the controller joined.
        code: SessionCode,
        /// Seat granted at join time; fixed until disconnect.
        slot: Slot,
    },
    /// The channel is gone.
    Disconnected,
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRole::Unbound => f.write_str("unbound"),
            ConnectionRole::Host { code } => write!(f, "host of session {code}"),
            ConnectionRole::Controller { code, slot } => {
                write!(f, "controller {slot} of session {code}")
            }
            ConnectionRole::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Events driving [`Connection`] role changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleEvent {
    /// The registry created a session hosted by this connection.
    BindHost(SessionCode),
    /// The registry seated this connection as a controller.
    BindController {
        /// Joined session.
        code: SessionCode,
        /// Granted seat.
        slot: Slot,
    },
    /// The underlying channel closed.
    ChannelClosed,
}

/// Error returned when an event cannot be applied from the current role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid role transition: {event:?} cannot be applied while {from}")]
pub struct InvalidTransition {
    /// Role at the time of the request.
    pub from: ConnectionRole,
    /// Rejected event.
    pub event: RoleEvent,
}

/// Returned when a role request arrives on a connection that already has a role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("connection is already {0}")]
pub struct AlreadyBound(pub ConnectionRole);

impl From<InvalidTransition> for AlreadyBound {
    fn from(err: InvalidTransition) -> Self {
        AlreadyBound(err.from)
    }
}

/// Server-side view of one WebSocket client.
#[derive(Debug)]
pub struct Connection {
    role: ConnectionRole,
    outbound: Outbound,
}

impl Connection {
    /// Track a freshly accepted channel.
    pub fn new(outbound: Outbound) -> Self {
        Self {
            role: ConnectionRole::Unbound,
            outbound,
        }
    }

    /// Identifier of the channel.
    pub fn id(&self) -> ConnectionId {
        self.outbound.id()
    }

    /// Handle used to write to this client.
    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    /// Current role.
    pub fn role(&self) -> &ConnectionRole {
        &self.role
    }

    /// Session this connection is bound to, if any.
    pub fn session_code(&self) -> Option<&SessionCode> {
        match &self.role {
            ConnectionRole::Host { code } | ConnectionRole::Controller { code, .. } => Some(code),
            ConnectionRole::Unbound | ConnectionRole::Disconnected => None,
        }
    }

    /// Reject role requests unless the connection is still unbound.
    pub fn ensure_unbound(&self) -> Result<(), AlreadyBound> {
        match self.role {
            ConnectionRole::Unbound => Ok(()),
            _ => Err(AlreadyBound(self.role.clone())),
        }
    }

    /// Apply `event`, returning the role the connection held before it.
    pub fn apply(&mut self, event: RoleEvent) -> Result<ConnectionRole, InvalidTransition> {
        let next = self.compute_transition(event)?;
        Ok(std::mem::replace(&mut self.role, next))
    }

    fn compute_transition(&self, event: RoleEvent) -> Result<ConnectionRole, InvalidTransition> {
        let next = match (&self.role, event) {
            (ConnectionRole::Unbound, RoleEvent::BindHost(code)) => ConnectionRole::Host { code },
            (ConnectionRole::Unbound, RoleEvent::BindController { code, slot }) => {
                ConnectionRole::Controller { code, slot }
            }
            (_, RoleEvent::ChannelClosed) => ConnectionRole::Disconnected,
            (from, event) => {
                return Err(InvalidTransition {
                    from: from.clone(),
                    event,
                });
            }
        };

        Ok(next)
    }
}
