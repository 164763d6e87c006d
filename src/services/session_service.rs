use tracing::{debug, info};

use crate::{
    dto::ws::{JoinOutcome, PlayerJoined, ServerMessage},
    error::JoinError,
    state::{AlreadyBound, Connection, RoleEvent, SessionCode, SharedState, Slot},
};

/// Create a session hosted by `connection` and bind it as host.
///
/// Only valid while the connection is unbound.
pub fn request_host(
    state: &SharedState,
    connection: &mut Connection,
) -> Result<SessionCode, AlreadyBound> {
    connection.ensure_unbound()?;

    let code = state
        .sessions()
        .create_session(connection.outbound().clone());
    if let Err(err) = connection.apply(RoleEvent::BindHost(code.clone())) {
        state.sessions().retire(&code, connection.id());
        return Err(err.into());
    }

    info!(%code, connection_id = %connection.id(), "host created session");
    Ok(code)
}

/// Seat `connection` as a controller of the session named by `raw_code`.
///
/// On success the caller has already been sent `controller_joined` and the host
/// `player_joined`; both are enqueued while the seat is held so they precede any
/// teardown notice. On failure nothing is sent and the connection stays unbound.
pub fn request_controller(
    state: &SharedState,
    connection: &mut Connection,
    raw_code: &str,
) -> Result<Slot, JoinError> {
    let code = SessionCode::parse(raw_code)
        .map_err(|err| JoinError::InvalidRequest(err.to_string()))?;
    connection
        .ensure_unbound()
        .map_err(|err| JoinError::InvalidRequest(err.to_string()))?;

    let controller = connection.outbound().clone();
    let peer_id = connection.id();
    let slot = state.sessions().join(&code, controller.clone(), |slot, session| {
        if controller
            .send(&ServerMessage::ControllerJoined(JoinOutcome::seated(slot)))
            .is_err()
        {
            debug!(%peer_id, "controller writer closed before join confirmation");
        }
        if session
            .host()
            .send(&ServerMessage::PlayerJoined(PlayerJoined { peer_id, slot }))
            .is_err()
        {
            debug!(code = %session.code(), "host writer closed; join not announced");
        }
    })?;

    if let Err(err) = connection.apply(RoleEvent::BindController {
        code: code.clone(),
        slot,
    }) {
        state.sessions().release(&code, peer_id, |_, _| {});
        return Err(JoinError::InvalidRequest(err.to_string()));
    }

    info!(%code, %slot, connection_id = %peer_id, "controller joined session");
    Ok(slot)
}
