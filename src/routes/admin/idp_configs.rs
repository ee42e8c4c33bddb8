use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};

use super::AdminError;
use crate::{
    AppState,
    mapping::Assertion,
    models::IdpConfig,
    schema::{FormDefinition, RawFields},
    services::MappingPreview,
};

// ============================================================================
// IdP binding CRUD endpoints
// ============================================================================

/// List every configured IdP binding, ordered by IdP identifier
#[tracing::instrument(name = "admin.idp_configs.list", skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<IdpConfig>>, AdminError> {
    Ok(Json(state.idp_configs.list().await?))
}

/// Get the binding for one IdP
#[tracing::instrument(name = "admin.idp_configs.get", skip(state), fields(%idp_id))]
pub async fn get(
    State(state): State<AppState>,
    Path(idp_id): Path<String>,
) -> Result<Json<IdpConfig>, AdminError> {
    let config = state
        .idp_configs
        .get(&idp_id)
        .await?
        .ok_or_else(|| AdminError::NotFound(format!("IdP '{}' is not configured", idp_id)))?;

    Ok(Json(config))
}

/// Create or replace the binding for an IdP
///
/// The body is the raw form submission: a JSON object of field keys to string
/// values. Omitted fields take their defaults, so this always writes the whole
/// record. Every invalid field is reported in the `fields` map of a 400 response.
#[tracing::instrument(name = "admin.idp_configs.put", skip(state, payload), fields(%idp_id))]
pub async fn put(
    State(state): State<AppState>,
    Path(idp_id): Path<String>,
    payload: Result<Json<RawFields>, JsonRejection>,
) -> Result<Json<IdpConfig>, AdminError> {
    let Json(raw) = payload?;
    let config = state.idp_configs.save(&idp_id, raw).await?;
    Ok(Json(config))
}

/// Remove the binding for an IdP
#[tracing::instrument(name = "admin.idp_configs.delete", skip(state), fields(%idp_id))]
pub async fn delete(
    State(state): State<AppState>,
    Path(idp_id): Path<String>,
) -> Result<StatusCode, AdminError> {
    state.idp_configs.delete(&idp_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Editing form for an IdP, with current or default values
#[tracing::instrument(name = "admin.idp_configs.form", skip(state), fields(%idp_id))]
pub async fn form(
    State(state): State<AppState>,
    Path(idp_id): Path<String>,
) -> Result<Json<FormDefinition>, AdminError> {
    Ok(Json(state.idp_configs.form(&idp_id).await?))
}

/// Dry-run the mapping of an assertion against the stored binding
#[tracing::instrument(
    name = "admin.idp_configs.preview_mapping",
    skip(state, payload),
    fields(%idp_id)
)]
pub async fn preview_mapping(
    State(state): State<AppState>,
    Path(idp_id): Path<String>,
    payload: Result<Json<Assertion>, JsonRejection>,
) -> Result<Json<MappingPreview>, AdminError> {
    let Json(assertion) = payload?;
    let preview = state
        .idp_configs
        .preview_mapping(&idp_id, &assertion)
        .await?;
    Ok(Json(preview))
}
