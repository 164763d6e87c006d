pub mod connection;
pub mod outbound;
pub mod registry;
pub mod session;
pub mod slots;

use std::sync::Arc;

use crate::config::AppConfig;

pub use self::connection::{AlreadyBound, Connection, ConnectionRole, InvalidTransition, RoleEvent};
pub use self::outbound::{ConnectionId, Delivery, DeliveryPolicy, Outbound, OutboundQueues};
pub use self::registry::{SessionInfo, SessionRegistry};
pub use self::session::{Session, SessionCode};
pub use self::slots::{Slot, SlotMap};

/// Shared handle passed to every route and socket task.
pub type SharedState = Arc<AppState>;

/// Central application state: immutable configuration plus the live session registry.
pub struct AppState {
    config: AppConfig,
    sessions: SessionRegistry,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            config,
            sessions: SessionRegistry::new(),
        })
    }

    /// Runtime configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry of active sessions keyed by their code.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }
}
