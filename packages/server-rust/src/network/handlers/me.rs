//! Current-principal endpoint.

use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::auth::CurrentPrincipal;

/// Public view of the authenticated principal. Never includes the secret hash.
#[derive(Debug, Serialize)]
pub struct PrincipalView {
    pub id: String,
    pub login: String,
    pub authorities: Vec<String>,
}

/// `GET /api/me` -- returns the caller's principal, or `401` when anonymous.
pub async fn me_handler(CurrentPrincipal(principal): CurrentPrincipal) -> Json<PrincipalView> {
    info!("principal lookup");
    Json(PrincipalView {
        id: principal.id().to_string(),
        login: principal.login().to_string(),
        authorities: principal
            .authorities()
            .iter()
            .map(ToString::to_string)
            .collect(),
    })
}
