mod error;
pub mod idp_configs;

use axum::{
    Router,
    routing::{get, post},
};
pub use error::{AdminError, ErrorInfo, ErrorResponse};

use crate::AppState;

pub fn get_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/idps", get(idp_configs::list))
        .route(
            "/idps/{idp_id}",
            get(idp_configs::get)
                .put(idp_configs::put)
                .delete(idp_configs::delete),
        )
        .route("/idps/{idp_id}/form", get(idp_configs::form))
        .route(
            "/idps/{idp_id}/mapping-preview",
            post(idp_configs::preview_mapping),
        )
}
