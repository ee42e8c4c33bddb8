//! Public endpoints used by the login and logout pages.

use axum::{
    Json,
    extract::{Path, State},
    response::Redirect,
};

use super::admin::AdminError;
use crate::{AppState, services::LoginLink};

/// IdPs to show as login buttons
#[tracing::instrument(name = "login.idps", skip(state))]
pub async fn list_idps(State(state): State<AppState>) -> Result<Json<Vec<LoginLink>>, AdminError> {
    Ok(Json(state.idp_configs.login_links().await?))
}

/// Send a user who signed in through `idp_id` to their post-logout page
#[tracing::instrument(name = "logout.redirect", skip(state), fields(%idp_id))]
pub async fn logout(
    State(state): State<AppState>,
    Path(idp_id): Path<String>,
) -> Result<Redirect, AdminError> {
    let target = state
        .idp_configs
        .logout_redirect(&idp_id, &state.default_logout_url)
        .await?;
    Ok(Redirect::to(&target))
}
