// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The node's minimal HTTP control plane (§6.5, §10.5).
//!
//! - POST `/ping` - liveness/version probe
//! - POST `/version` - same payload, kept for backward compatibility

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;

/// Shared state behind the control-plane router.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    version: String,
    auth_token: Option<String>,
}

impl AppState {
    /// Builds the router's shared state. When `auth_token` is set, every request must carry a
    /// matching `Authorization: Bearer <token>` header or the handler returns 401 (§6.5).
    #[must_use]
    pub fn new(version: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                version: version.into(),
                auth_token,
            }),
        }
    }
}

#[derive(Serialize)]
struct PingResponse {
    version: String,
}

/// Builds the control-plane router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ping", post(ping))
        .route("/version", post(ping))
        .with_state(state)
}

async fn ping(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<PingResponse>, StatusCode> {
    if !is_authorized(&state, &headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(PingResponse {
        version: state.inner.version.clone(),
    }))
}

fn is_authorized(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(expected) = &state.inner.auth_token else {
        return true;
    };
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        == Some(expected.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn ping_returns_version_when_unauthenticated_access_is_allowed() {
        let app = router(AppState::new("1.2.3", None));
        let response = app
            .oneshot(Request::builder().method("POST").uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["version"], "1.2.3");
    }

    #[tokio::test]
    async fn version_alias_matches_ping() {
        let app = router(AppState::new("1.2.3", None));
        let response = app
            .oneshot(Request::builder().method("POST").uri("/version").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_bearer_token_is_rejected() {
        let app = router(AppState::new("1.2.3", Some("secret".to_string())));
        let response = app
            .oneshot(Request::builder().method("POST").uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn correct_bearer_token_is_accepted() {
        let app = router(AppState::new("1.2.3", Some("secret".to_string())));
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/ping")
                    .header("authorization", "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
