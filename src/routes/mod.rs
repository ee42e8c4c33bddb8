pub mod admin;
pub mod health;
pub mod login;

use axum::{Router, routing::get};

use crate::AppState;

/// All HTTP routes, before state and middleware are attached.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/login/idps", get(login::list_idps))
        .route("/logout/{idp_id}", get(login::logout))
        .nest("/admin", admin::get_admin_routes())
}
