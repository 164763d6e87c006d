//! Controller seating: the two player slots of a session.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    error::JoinError,
    state::outbound::{ConnectionId, Outbound},
};

/// Seating position of a bound controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Slot {
    /// Player 1, the only seat allowed to issue privileged commands.
    One,
    /// Player 2.
    Two,
}

impl Slot {
    /// Every slot in allocation order.
    pub const ALL: [Slot; 2] = [Slot::One, Slot::Two];

    /// Player number shown to clients.
    pub fn number(self) -> u8 {
        match self {
            Slot::One => 1,
            Slot::Two => 2,
        }
    }

    fn index(self) -> usize {
        match self {
            Slot::One => 0,
            Slot::Two => 1,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.number()
    }
}

/// Raised when a wire value does not name a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("slot must be 1 or 2 (got {0})")]
pub struct InvalidSlot(pub u8);

impl TryFrom<u8> for Slot {
    type Error = InvalidSlot;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Slot::One),
            2 => Ok(Slot::Two),
            other => Err(InvalidSlot(other)),
        }
    }
}

/// Occupancy of the two controller seats of one session.
///
/// Allocation is deterministic: the lowest free slot wins, with no reservations and no
/// waiting list. A released slot is immediately available to the next joiner.
#[derive(Debug, Default)]
pub struct SlotMap {
    occupants: [Option<Outbound>; 2],
}

impl SlotMap {
    /// Seat a controller in the lowest free slot.
    pub fn assign(&mut self, controller: Outbound) -> Result<Slot, JoinError> {
        let slot = Slot::ALL
            .into_iter()
            .find(|slot| self.occupants[slot.index()].is_none())
            .ok_or(JoinError::RoomFull)?;
        self.occupants[slot.index()] = Some(controller);
        Ok(slot)
    }

    /// Free the slot held by `id`, returning which one it was.
    pub fn release(&mut self, id: ConnectionId) -> Option<Slot> {
        let slot = self.slot_of(id)?;
        self.occupants[slot.index()] = None;
        Some(slot)
    }

    /// Slot currently held by `id`.
    pub fn slot_of(&self, id: ConnectionId) -> Option<Slot> {
        self.occupied()
            .find(|(_, occupant)| occupant.id() == id)
            .map(|(slot, _)| slot)
    }

    /// Connection seated at `slot`.
    pub fn occupant(&self, slot: Slot) -> Option<&Outbound> {
        self.occupants[slot.index()].as_ref()
    }

    /// Occupied slots in seating order.
    pub fn occupied(&self) -> impl Iterator<Item = (Slot, &Outbound)> {
        Slot::ALL
            .into_iter()
            .filter_map(|slot| self.occupant(slot).map(|occupant| (slot, occupant)))
    }

    /// Number of seated controllers.
    pub fn len(&self) -> usize {
        self.occupants.iter().flatten().count()
    }

    /// Whether no controller is seated.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both slots are taken.
    pub fn is_full(&self) -> bool {
        self.len() == Slot::ALL.len()
    }
}
