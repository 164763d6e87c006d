use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Couch Arcade Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::catalog::list_roms,
        crate::routes::join_link::join_link,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::catalog::RomEntry,
            crate::dto::join_link::JoinLinkResponse,
            crate::dto::ws::ClientMessage,
            crate::dto::ws::ServerMessage,
            crate::dto::ws::InputEvent,
            crate::dto::ws::ButtonTransition,
            crate::error::ErrorKind,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Game titles available to the host"),
        (name = "sessions", description = "Join links for active sessions"),
        (name = "relay", description = "WebSocket channel for hosts and controllers"),
    )
)]
pub struct ApiDoc;
