use tracing::{debug, warn};

use crate::{
    dto::ws::{InputEvent, RelayedInput, ServerMessage},
    error::{CommandOrigin, RelayError},
    state::{Connection, ConnectionRole, Delivery, SharedState, Slot, outbound::encode_event},
};

/// Per-message delivery tally of a relay fan-out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RelayReport {
    /// Recipients whose queue accepted the frame.
    pub delivered: usize,
    /// Recipients whose queue was saturated.
    pub dropped: usize,
}

/// Forward a button transition to every other bound connection of the sender's session.
///
/// A sender that is no longer a member of the session named by its role gets
/// [`RelayError::SessionClosed`]. Delivery is best effort: recipients with a saturated
/// relay queue miss this transition and are expected to catch up with the next one. The
/// sender never receives its own input back.
pub fn relay_input(
    state: &SharedState,
    connection: &Connection,
    input: InputEvent,
) -> Result<RelayReport, RelayError> {
    let (code, slot) = match connection.role() {
        ConnectionRole::Host { code } => (code, None),
        ConnectionRole::Controller { code, slot } => (code, Some(*slot)),
        ConnectionRole::Unbound | ConnectionRole::Disconnected => {
            return Err(RelayError::NotBound);
        }
    };

    let audience = state
        .sessions()
        .audience(code, connection.id())
        .ok_or(RelayError::SessionClosed)?;

    let frame = match encode_event(&ServerMessage::Input(RelayedInput { slot, input })) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(error = %err, "failed to serialize relayed input");
            return Ok(RelayReport::default());
        }
    };

    let mut report = RelayReport::default();
    for peer in audience {
        match peer.relay(frame.clone()) {
            Delivery::Queued => report.delivered += 1,
            Delivery::Dropped => {
                report.dropped += 1;
                debug!(%code, recipient = %peer.id(), "relay queue full; input dropped");
            }
            Delivery::Closed => {
                debug!(%code, recipient = %peer.id(), "recipient writer closed; input dropped");
            }
        }
    }

    Ok(report)
}

/// Forward a reset request to the host when it comes from the controller at slot 1.
///
/// Any other origin yields [`RelayError::UnauthorizedCommand`], which callers log and
/// otherwise ignore.
pub fn relay_reset(state: &SharedState, connection: &Connection) -> Result<(), RelayError> {
    let code = match connection.role() {
        ConnectionRole::Controller {
            code,
            slot: Slot::One,
        } => code,
        ConnectionRole::Controller { slot, .. } => {
            return Err(RelayError::UnauthorizedCommand {
                origin: CommandOrigin::Controller(*slot),
            });
        }
        ConnectionRole::Host { .. } => {
            return Err(RelayError::UnauthorizedCommand {
                origin: CommandOrigin::Host,
            });
        }
        ConnectionRole::Unbound | ConnectionRole::Disconnected => {
            return Err(RelayError::NotBound);
        }
    };

    let host = state
        .sessions()
        .host_for_seat(code, connection.id(), Slot::One)
        .ok_or(RelayError::SessionClosed)?;
    host.send(&ServerMessage::ResetGame)
        .map_err(|_| RelayError::SessionClosed)
}
