//! Session data: the host-led pairing context addressed by a six digit code.

use std::{fmt, time::Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::ValidationError;

use crate::{
    dto::validation::validate_session_code,
    state::{
        outbound::{ConnectionId, Outbound},
        slots::{Slot, SlotMap},
    },
};

/// Size of the numeric code space (`000000`..=`999999`).
const CODE_SPACE: u32 = 1_000_000;

/// Six ASCII digit identifier of an active session.
///
/// Codes are opaque strings: `000417` is a valid code distinct from `417`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct SessionCode(String);

impl SessionCode {
    /// Draw a candidate uniformly from the whole six digit range.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(format!("{:06}", rng.random_range(0..CODE_SPACE)))
    }

    /// Parse a client supplied code, tolerating surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        validate_session_code(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// Borrow the code as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Live state of one session: its host and the controllers seated in it.
#[derive(Debug)]
pub struct Session {
    code: SessionCode,
    host: Outbound,
    slots: SlotMap,
    created_at: Instant,
}

impl Session {
    /// Open a session owned by `host`, with both slots free.
    pub fn new(code: SessionCode, host: Outbound) -> Self {
        Self {
            code,
            host,
            slots: SlotMap::default(),
            created_at: Instant::now(),
        }
    }

    /// Code the session is registered under.
    pub fn code(&self) -> &SessionCode {
        &self.code
    }

    /// Handle of the host connection.
    pub fn host(&self) -> &Outbound {
        &self.host
    }

    /// Whether `id` is this session's host.
    pub fn is_hosted_by(&self, id: ConnectionId) -> bool {
        self.host.id() == id
    }

    /// Whether `id` is the host or a seated controller.
    pub fn is_member(&self, id: ConnectionId) -> bool {
        self.is_hosted_by(id) || self.slots.slot_of(id).is_some()
    }

    /// Controller seating.
    pub fn slots(&self) -> &SlotMap {
        &self.slots
    }

    /// Mutable controller seating.
    pub fn slots_mut(&mut self) -> &mut SlotMap {
        &mut self.slots
    }

    /// When the host created the session.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Every bound connection of the session except `sender`.
    pub fn recipients_except(&self, sender: ConnectionId) -> Vec<Outbound> {
        std::iter::once(&self.host)
            .chain(self.slots.occupied().map(|(_, controller)| controller))
            .filter(|peer| peer.id() != sender)
            .cloned()
            .collect()
    }

    /// Seated controllers, in slot order.
    pub fn controllers(&self) -> Vec<(Slot, Outbound)> {
        self.slots
            .occupied()
            .map(|(slot, controller)| (slot, controller.clone()))
            .collect()
    }
}
