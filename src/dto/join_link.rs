use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{dto::validation::validate_session_code, state::SessionCode};

/// Path parameters of the join link route.
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Path)]
pub struct SessionCodePath {
    /// Six digit session code.
    #[validate(custom(function = "validate_session_code"))]
    pub code: String,
}

/// Where a phone should navigate to join a session as a controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct JoinLinkResponse {
    /// Session the link joins.
    pub code: SessionCode,
    /// `data:image/svg+xml` URL of a QR code encoding `url`.
    pub qr: String,
    /// Controller page URL carrying the code.
    pub url: String,
    /// Same URL, for typing in by hand.
    pub manual_url: String,
}
