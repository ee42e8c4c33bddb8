//! Configuration and account mapping for SAML2 identity-provider bindings.
//!
//! Each IdP binding records which NameID format to request, which assertion
//! attribute identifies the user, which local account field it matches, and
//! a handful of presentation toggles. This crate validates administrator
//! submissions ([`schema`]), persists the records ([`store`]), turns incoming
//! assertions into local account keys ([`mapping`]), and exposes the admin
//! surface over HTTP ([`routes`]).

#[cfg(feature = "server")]
pub mod config;
pub mod mapping;
pub mod models;
#[cfg(feature = "server")]
pub mod observability;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::Router;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::{
    services::IdpConfigService,
    store::{IdpConfigStore, MemoryIdpConfigStore},
};

/// Request body limit applied when none is configured.
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub idp_configs: IdpConfigService,
    /// Post-logout page for IdPs without an alternate logout URL
    pub default_logout_url: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<dyn IdpConfigStore>) -> Self {
        Self {
            idp_configs: IdpConfigService::new(store),
            default_logout_url: Arc::from("/"),
        }
    }

    pub fn with_default_logout_url(mut self, url: impl Into<Arc<str>>) -> Self {
        self.default_logout_url = url.into();
        self
    }

    /// State backed by a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryIdpConfigStore::new()))
    }
}

pub fn build_app(state: AppState) -> Router {
    build_app_with_body_limit(state, DEFAULT_BODY_LIMIT_BYTES)
}

pub fn build_app_with_body_limit(state: AppState, body_limit_bytes: usize) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .with_state(state)
}
