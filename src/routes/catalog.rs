use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::catalog::RomEntry, error::AppError, services::catalog_service, state::SharedState,
};

/// Catalog endpoints listing the titles a host can load.
pub fn router() -> Router<SharedState> {
    Router::new().route("/api/roms", get(list_roms))
}

#[utoipa::path(
    get,
    path = "/api/roms",
    tag = "catalog",
    responses(
        (status = 200, description = "Available game titles", body = [RomEntry]),
        (status = 500, description = "Catalog directory could not be read")
    )
)]
/// List the game titles found in the catalog directory.
pub async fn list_roms(State(state): State<SharedState>) -> Result<Json<Vec<RomEntry>>, AppError> {
    let roms = catalog_service::list_roms(state.config().roms_dir()).await?;
    Ok(Json(roms))
}
