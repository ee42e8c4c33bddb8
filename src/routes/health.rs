//! Health check endpoint for probes and monitoring.

use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// "healthy" or "unhealthy"
    pub status: &'static str,
    pub version: &'static str,
    pub store: ComponentStatus,
}

#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub latency_ms: u64,
}

#[tracing::instrument(name = "health.check", skip(state))]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = std::time::Instant::now();
    let result = state.idp_configs.health_check().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let store = match result {
        Ok(()) => ComponentStatus {
            healthy: true,
            message: None,
            latency_ms,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            ComponentStatus {
                healthy: false,
                message: Some("Store connection failed".to_string()),
                latency_ms,
            }
        }
    };

    let (status_code, status) = if store.healthy {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
    };

    (
        status_code,
        Json(HealthStatus {
            status,
            version: env!("CARGO_PKG_VERSION"),
            store,
        }),
    )
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::build_app;

    #[tokio::test]
    async fn test_health_check_memory_store() {
        let app = build_app(AppState::in_memory());
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["store"]["healthy"], true);
        assert!(!body["version"].as_str().unwrap().is_empty());
    }
}
