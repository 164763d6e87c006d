//! In-memory registry of active sessions keyed by code.
//!
//! Every mutation of a session runs under that session's map entry lock, so joins, leaves
//! and teardown of one session are serialized while different sessions proceed
//! independently. Callbacks passed to [`SessionRegistry::join`] and
//! [`SessionRegistry::release`] run under the same lock, which keeps the notifications
//! they enqueue ordered with respect to a concurrent teardown. Callbacks must not touch
//! the registry.

use dashmap::{DashMap, mapref::entry::Entry};
use rand::Rng;
use tracing::debug;

use crate::{
    error::JoinError,
    state::{
        outbound::{ConnectionId, Outbound},
        session::{Session, SessionCode},
        slots::Slot,
    },
};

/// Read-only view of a session returned by [`SessionRegistry::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    /// Code of the session.
    pub code: SessionCode,
    /// Connection bound as host.
    pub host_id: ConnectionId,
    /// Slots currently held by controllers.
    pub occupied: Vec<Slot>,
}

/// Concurrent map from session code to session state.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionCode, Session>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh code and register a session hosted by `host`.
    pub fn create_session(&self, host: Outbound) -> SessionCode {
        self.create_session_with(host, &mut rand::rng())
    }

    /// Same as [`Self::create_session`] with an explicit random source.
    ///
    /// The candidate is checked and inserted through the entry API, so two concurrent
    /// creations can never commit the same code; a collision draws a new candidate.
    pub fn create_session_with<R: Rng + ?Sized>(&self, host: Outbound, rng: &mut R) -> SessionCode {
        loop {
            let code = SessionCode::random(rng);
            match self.sessions.entry(code.clone()) {
                Entry::Occupied(_) => {
                    debug!(%code, "session code already active; drawing another");
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(Session::new(code.clone(), host));
                    return code;
                }
            }
        }
    }

    /// Snapshot a session without side effects.
    pub fn lookup(&self, code: &SessionCode) -> Option<SessionInfo> {
        self.sessions.get(code).map(|session| SessionInfo {
            code: session.code().clone(),
            host_id: session.host().id(),
            occupied: session.slots().occupied().map(|(slot, _)| slot).collect(),
        })
    }

    /// Seat `controller` in the session, running `on_seated` while the seat is held.
    pub fn join<F>(
        &self,
        code: &SessionCode,
        controller: Outbound,
        on_seated: F,
    ) -> Result<Slot, JoinError>
    where
        F: FnOnce(Slot, &Session),
    {
        let mut session = self
            .sessions
            .get_mut(code)
            .ok_or(JoinError::SessionNotFound)?;
        let slot = session.slots_mut().assign(controller)?;
        on_seated(slot, &*session);
        Ok(slot)
    }

    /// Free the slot held by controller `id`, running `on_released` with the freed slot.
    ///
    /// Returns `None` when the session is gone or `id` holds no seat in it.
    pub fn release<F>(&self, code: &SessionCode, id: ConnectionId, on_released: F) -> Option<Slot>
    where
        F: FnOnce(Slot, &Session),
    {
        let mut session = self.sessions.get_mut(code)?;
        let slot = session.slots_mut().release(id)?;
        on_released(slot, &*session);
        Some(slot)
    }

    /// Remove the session unconditionally. Idempotent.
    pub fn destroy(&self, code: &SessionCode) -> Option<Session> {
        self.sessions.remove(code).map(|(_, session)| session)
    }

    /// Remove the session only while `host_id` still hosts it.
    ///
    /// Guards against retiring a newer session that reused the code.
    pub fn retire(&self, code: &SessionCode, host_id: ConnectionId) -> Option<Session> {
        self.sessions
            .remove_if(code, |_, session| session.is_hosted_by(host_id))
            .map(|(_, session)| session)
    }

    /// Everyone bound to the session except `sender`.
    ///
    /// Returns `None` when the session is gone or `sender` is not a member of it, so a
    /// connection still holding a retired code cannot reach a newer session using it.
    pub fn audience(&self, code: &SessionCode, sender: ConnectionId) -> Option<Vec<Outbound>> {
        self.sessions
            .get(code)
            .filter(|session| session.is_member(sender))
            .map(|session| session.recipients_except(sender))
    }

    /// Host handle of the session, provided `controller` currently holds `slot` in it.
    pub fn host_for_seat(
        &self,
        code: &SessionCode,
        controller: ConnectionId,
        slot: Slot,
    ) -> Option<Outbound> {
        self.sessions
            .get(code)
            .filter(|session| session.slots().slot_of(controller) == Some(slot))
            .map(|session| session.host().clone())
    }

    /// Slot held by `id` in the session, if any.
    pub fn slot_of(&self, code: &SessionCode, id: ConnectionId) -> Option<Slot> {
        self.sessions
            .get(code)
            .and_then(|session| session.slots().slot_of(id))
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is active.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use rand::{SeedableRng, rngs::StdRng};
    use uuid::Uuid;

    use super::*;
    use crate::state::outbound::DeliveryPolicy;

    fn peer() -> Outbound {
        Outbound::channel(Uuid::new_v4(), 4, DeliveryPolicy::Volatile).0
    }

    #[test]
    fn colliding_candidate_is_redrawn() {
        let registry = SessionRegistry::new();
        let first = registry.create_session_with(peer(), &mut StdRng::seed_from_u64(7));
        let second = registry.create_session_with(peer(), &mut StdRng::seed_from_u64(7));

        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lookup_reports_host_and_seats() {
        let registry = SessionRegistry::new();
        let host = peer();
        let host_id = host.id();
        let code = registry.create_session(host);
        registry.join(&code, peer(), |_, _| {}).unwrap();

        let info = registry.lookup(&code).unwrap();
        assert_eq!(info.host_id, host_id);
        assert_eq!(info.occupied, vec![Slot::One]);
    }

    #[test]
    fn join_unknown_code_is_session_not_found() {
        let registry = SessionRegistry::new();
        let code = SessionCode::parse("000000").unwrap();
        assert_eq!(
            registry.join(&code, peer(), |_, _| {}),
            Err(JoinError::SessionNotFound)
        );
    }

    #[test]
    fn third_joiner_is_rejected() {
        let registry = SessionRegistry::new();
        let code = registry.create_session(peer());
        assert_eq!(registry.join(&code, peer(), |_, _| {}), Ok(Slot::One));
        assert_eq!(registry.join(&code, peer(), |_, _| {}), Ok(Slot::Two));
        assert_eq!(
            registry.join(&code, peer(), |_, _| {}),
            Err(JoinError::RoomFull)
        );
    }

    #[test]
    fn retire_ignores_foreign_host_and_destroy_is_idempotent() {
        let registry = SessionRegistry::new();
        let host = peer();
        let host_id = host.id();
        let code = registry.create_session(host);

        assert!(registry.retire(&code, Uuid::new_v4()).is_none());
        assert!(registry.retire(&code, host_id).is_some());
        assert!(registry.destroy(&code).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn release_frees_the_seat_for_the_next_joiner() {
        let registry = SessionRegistry::new();
        let code = registry.create_session(peer());
        let a = peer();
        let a_id = a.id();
        registry.join(&code, a, |_, _| {}).unwrap();
        registry.join(&code, peer(), |_, _| {}).unwrap();

        let mut released = None;
        assert_eq!(
            registry.release(&code, a_id, |slot, _| released = Some(slot)),
            Some(Slot::One)
        );
        assert_eq!(released, Some(Slot::One));
        assert_eq!(registry.release(&code, a_id, |_, _| {}), None);
        assert_eq!(registry.join(&code, peer(), |_, _| {}), Ok(Slot::One));
    }

    #[test]
    fn concurrent_joiners_never_share_a_slot() {
        let registry = Arc::new(SessionRegistry::new());
        let code = registry.create_session(peer());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let code = code.clone();
                std::thread::spawn(move || registry.join(&code, peer(), |_, _| {}))
            })
            .collect();
        let outcomes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let seated: HashSet<_> = outcomes.iter().filter_map(|o| o.clone().ok()).collect();
        assert_eq!(seated, HashSet::from([Slot::One, Slot::Two]));
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == Err(JoinError::RoomFull))
                .count(),
            6
        );
    }

    #[test]
    fn reused_code_is_closed_to_members_of_the_retired_session() {
        let registry = SessionRegistry::new();
        let old_host = peer();
        let old_host_id = old_host.id();
        let code = registry.create_session_with(old_host, &mut StdRng::seed_from_u64(11));
        let stale = peer();
        let stale_id = stale.id();
        registry.join(&code, stale, |_, _| {}).unwrap();
        assert!(registry.audience(&code, stale_id).is_some());

        registry.retire(&code, old_host_id).unwrap();
        let new_host = peer();
        let new_host_id = new_host.id();
        let reused = registry.create_session_with(new_host, &mut StdRng::seed_from_u64(11));
        assert_eq!(reused, code);

        assert!(registry.audience(&code, stale_id).is_none());
        assert!(registry.audience(&code, old_host_id).is_none());
        assert!(registry.host_for_seat(&code, stale_id, Slot::One).is_none());
        assert_eq!(registry.release(&code, stale_id, |_, _| {}), None);

        let fresh = peer();
        let fresh_id = fresh.id();
        assert_eq!(registry.join(&code, fresh, |_, _| {}), Ok(Slot::One));
        assert_eq!(
            registry
                .host_for_seat(&code, fresh_id, Slot::One)
                .map(|host| host.id()),
            Some(new_host_id)
        );
        assert!(registry.host_for_seat(&code, fresh_id, Slot::Two).is_none());
    }

    #[test]
    fn concurrent_leave_and_join_keep_seating_consistent() {
        for _ in 0..64 {
            let registry = Arc::new(SessionRegistry::new());
            let code = registry.create_session(peer());
            let leaving = peer();
            let leaving_id = leaving.id();
            registry.join(&code, leaving, |_, _| {}).unwrap();
            registry.join(&code, peer(), |_, _| {}).unwrap();

            let leaver = {
                let registry = Arc::clone(&registry);
                let code = code.clone();
                std::thread::spawn(move || registry.release(&code, leaving_id, |_, _| {}))
            };
            let joiner = {
                let registry = Arc::clone(&registry);
                let code = code.clone();
                std::thread::spawn(move || registry.join(&code, peer(), |_, _| {}))
            };

            assert_eq!(leaver.join().unwrap(), Some(Slot::One));
            let joined = joiner.join().unwrap();
            let occupied = registry.lookup(&code).unwrap().occupied;
            match joined {
                // The join ran after the leave and took the freed seat.
                Ok(slot) => {
                    assert_eq!(slot, Slot::One);
                    assert_eq!(occupied, vec![Slot::One, Slot::Two]);
                }
                // The join ran while both seats were still taken.
                Err(err) => {
                    assert_eq!(err, JoinError::RoomFull);
                    assert_eq!(occupied, vec![Slot::Two]);
                }
            }
        }
    }

    #[test]
    fn concurrent_creations_yield_distinct_codes() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    (0..64)
                        .map(|_| registry.create_session(peer()))
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let codes: Vec<_> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let unique: HashSet<_> = codes.iter().cloned().collect();

        assert_eq!(unique.len(), codes.len());
        assert_eq!(registry.len(), codes.len());
    }
}
