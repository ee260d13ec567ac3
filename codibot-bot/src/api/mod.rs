//! HTTP transport glue
//!
//! The chat frontend delivers pre-classified events with `POST /event`
//! and sends the returned replies back to the user in order. The core
//! never talks to the transport directly.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::dispatch::Dispatcher;
use codibot_common::events::InboundEvent;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// Ordered replies for one inbound event
#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub replies: Vec<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
}

/// Build the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/event", post(handle_event))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /event
async fn handle_event(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> Json<EventResponse> {
    let replies = state.dispatcher.handle_event(event).await;
    Json(EventResponse { replies })
}

/// GET /health
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "codibot-bot".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use codibot_common::config::CrowdConfig;
    use codibot_common::db::connect_memory;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let pool = connect_memory().await.unwrap();
        let dispatcher = Arc::new(Dispatcher::new(pool, CrowdConfig::default()));
        create_router(AppState { dispatcher })
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let app = test_router().await;
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["module"], "codibot-bot");
    }

    #[tokio::test]
    async fn event_endpoint_returns_ordered_replies() {
        let app = test_router().await;
        let payload = serde_json::json!({
            "user_id": "u1",
            "kind": "text",
            "text": "this matches nothing"
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/event")
                    .header("content-type", "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["replies"].as_array().unwrap().len(), 1);
    }
}
