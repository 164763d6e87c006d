use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use validator::Validate;

use crate::{
    dto::join_link::{JoinLinkResponse, SessionCodePath},
    error::AppError,
    services::join_link_service,
    state::SharedState,
};

/// Join link endpoints used by the host screen to display its QR code.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/qr/{code}", get(join_link))
}

#[utoipa::path(
    get,
    path = "/api/qr/{code}",
    tag = "sessions",
    params(SessionCodePath),
    responses(
        (status = 200, description = "Join link for the session", body = JoinLinkResponse),
        (status = 400, description = "Malformed session code"),
        (status = 404, description = "No active session with this code"),
        (status = 500, description = "QR code could not be rendered")
    )
)]
/// Return the controller URL a phone should open to join the session, with its QR code.
pub async fn join_link(
    State(state): State<SharedState>,
    Path(path): Path<SessionCodePath>,
) -> Result<Json<JoinLinkResponse>, AppError> {
    path.validate()?;
    Ok(Json(join_link_service::join_link(&state, &path.code)?))
}
