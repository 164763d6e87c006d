use axum::Router;
use tower_http::services::ServeDir;

use crate::state::SharedState;

pub mod catalog;
pub mod docs;
pub mod health;
pub mod join_link;
pub mod websocket;

/// Compose all route trees, wiring in shared state, documentation routes and the
/// static UI fallback.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(websocket::router())
        .merge(catalog::router())
        .merge(join_link::router())
        .merge(docs::router());

    let static_files = ServeDir::new(state.config().public_dir());

    api_router
        .with_state(state)
        .fallback_service(static_files)
}
