use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness along with the number of active sessions.
pub fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.sessions().len())
}
