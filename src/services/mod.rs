/// ROM catalog listing.
pub mod catalog_service;
/// Disconnect cascade run when a channel closes.
pub mod disconnect;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Join links handed to phones.
pub mod join_link_service;
/// Input and command relay between session members.
pub mod relay;
/// Host and controller role requests.
pub mod session_service;
/// WebSocket connection and message handling service.
pub mod websocket_service;

#[cfg(test)]
pub(crate) mod test_support;
