use tracing::{debug, info};

use crate::{
    dto::ws::{PlayerLeft, ServerMessage},
    state::{Connection, ConnectionRole, RoleEvent, SessionCode, SharedState, Slot},
};

/// What a closed channel tore down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cascade {
    /// The connection held no role, or its cleanup already ran.
    None,
    /// A host left: its session is gone and its controllers were told.
    SessionRetired {
        /// Retired session.
        code: SessionCode,
        /// Controllers that received `host_disconnected`.
        notified: usize,
    },
    /// A controller left: its slot is free again.
    SlotFreed {
        /// Session the controller was seated in.
        code: SessionCode,
        /// Freed slot.
        slot: Slot,
        /// Parties that received `player_left`.
        notified: usize,
    },
}

/// Run the disconnect cascade for `connection` exactly once.
///
/// Later calls on the same connection return [`Cascade::None`].
pub fn handle_channel_closed(state: &SharedState, connection: &mut Connection) -> Cascade {
    let id = connection.id();
    let previous = match connection.apply(RoleEvent::ChannelClosed) {
        Ok(previous) => previous,
        Err(err) => {
            debug!(error = %err, connection_id = %id, "close transition rejected");
            return Cascade::None;
        }
    };

    match previous {
        ConnectionRole::Host { code } => {
            let Some(session) = state.sessions().retire(&code, id) else {
                debug!(%code, connection_id = %id, "host left an already retired session");
                return Cascade::None;
            };

            let mut notified = 0;
            for (slot, controller) in session.controllers() {
                match controller.send(&ServerMessage::HostDisconnected) {
                    Ok(()) => notified += 1,
                    Err(_) => debug!(%code, %slot, "controller writer already closed"),
                }
            }

            let age = session.created_at().elapsed();
            info!(%code, notified, ?age, "host disconnected; session retired");
            Cascade::SessionRetired { code, notified }
        }
        ConnectionRole::Controller { code, slot } => {
            let mut notified = 0;
            let released = state.sessions().release(&code, id, |freed, session| {
                let notice = ServerMessage::PlayerLeft(PlayerLeft { slot: freed });
                for peer in session.recipients_except(id) {
                    if peer.send(&notice).is_ok() {
                        notified += 1;
                    }
                }
            });

            match released {
                Some(freed) => {
                    info!(%code, slot = %freed, "controller left session");
                    Cascade::SlotFreed {
                        code,
                        slot: freed,
                        notified,
                    }
                }
                None => {
                    debug!(%code, %slot, "controller left a session that no longer exists");
                    Cascade::None
                }
            }
        }
        ConnectionRole::Unbound | ConnectionRole::Disconnected => Cascade::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        services::{
            session_service::{request_controller, request_host},
            test_support::{client, drain_events, next_event},
        },
        state::AppState,
    };

    #[test]
    fn host_close_retires_session_and_notifies_each_controller_once() {
        let state = AppState::new(AppConfig::default());
        let (mut host, _host_q) = client();
        let code = request_host(&state, &mut host).unwrap();
        let (mut a, mut a_q) = client();
        let (mut b, mut b_q) = client();
        request_controller(&state, &mut a, code.as_str()).unwrap();
        request_controller(&state, &mut b, code.as_str()).unwrap();
        drain_events(&mut a_q);
        drain_events(&mut b_q);

        assert_eq!(
            handle_channel_closed(&state, &mut host),
            Cascade::SessionRetired {
                code: code.clone(),
                notified: 2
            }
        );
        assert!(state.sessions().lookup(&code).is_none());
        assert_eq!(drain_events(&mut a_q), vec![ServerMessage::HostDisconnected]);
        assert_eq!(drain_events(&mut b_q), vec![ServerMessage::HostDisconnected]);

        assert_eq!(handle_channel_closed(&state, &mut host), Cascade::None);
        assert_eq!(next_event(&mut a_q), None);
    }

    #[test]
    fn controller_close_frees_slot_and_notifies_remaining_parties() {
        let state = AppState::new(AppConfig::default());
        let (mut host, mut host_q) = client();
        let code = request_host(&state, &mut host).unwrap();
        let (mut a, _a_q) = client();
        let (mut b, mut b_q) = client();
        request_controller(&state, &mut a, code.as_str()).unwrap();
        request_controller(&state, &mut b, code.as_str()).unwrap();
        drain_events(&mut host_q);
        drain_events(&mut b_q);

        assert_eq!(
            handle_channel_closed(&state, &mut a),
            Cascade::SlotFreed {
                code: code.clone(),
                slot: Slot::One,
                notified: 2
            }
        );
        let left = ServerMessage::PlayerLeft(PlayerLeft { slot: Slot::One });
        assert_eq!(drain_events(&mut host_q), vec![left.clone()]);
        assert_eq!(drain_events(&mut b_q), vec![left]);
        assert_eq!(state.sessions().lookup(&code).unwrap().occupied, vec![Slot::Two]);

        assert_eq!(handle_channel_closed(&state, &mut a), Cascade::None);

        let (mut c, _c_q) = client();
        assert_eq!(
            request_controller(&state, &mut c, code.as_str()),
            Ok(Slot::One)
        );
    }

    #[test]
    fn controller_close_after_host_left_is_quiet() {
        let state = AppState::new(AppConfig::default());
        let (mut host, _host_q) = client();
        let code = request_host(&state, &mut host).unwrap();
        let (mut a, _a_q) = client();
        request_controller(&state, &mut a, code.as_str()).unwrap();

        handle_channel_closed(&state, &mut host);
        assert_eq!(handle_channel_closed(&state, &mut a), Cascade::None);
        assert!(state.sessions().is_empty());
    }

    #[test]
    fn unbound_close_touches_nothing() {
        let state = AppState::new(AppConfig::default());
        let (mut host, _host_q) = client();
        request_host(&state, &mut host).unwrap();
        let (mut stranger, _q) = client();

        assert_eq!(handle_channel_closed(&state, &mut stranger), Cascade::None);
        assert_eq!(state.sessions().len(), 1);
    }
}
