//! `POST /api/ai/chat` over HTTP.

use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::info;

use crate::{
    ai::{ChatProxy, ChatRequest, proxy::ANONYMOUS},
    error::ChatError,
};

pub const CHAT_PATH: &str = "/api/ai/chat";
pub const USER_HEADER: &str = "x-user-id";

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (
            status,
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}

pub fn router(proxy: Arc<ChatProxy>) -> Router {
    Router::new().route(CHAT_PATH, post(chat)).with_state(proxy)
}

fn identity(headers: &HeaderMap) -> &str {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS)
}

async fn chat(
    State(proxy): State<Arc<ChatProxy>>,
    headers: HeaderMap,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let identity = identity(&headers);
    if let Err(e) = proxy.admit(identity) {
        return e.into_response();
    }
    let Ok(Json(req)) = body else {
        return ChatError::InvalidMessage.into_response();
    };

    match proxy.forward(req).await {
        Ok(res) => Json(res).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn serve(addr: SocketAddr, proxy: Arc<ChatProxy>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "chat proxy listening");
    axum::serve(listener, router(proxy))
        .await
        .context("HTTP server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ai::{RateLimiter, proxy::test_support::FakeClient},
        clock::ManualClock,
    };
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use chrono::{TimeZone, Utc};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app(client: FakeClient) -> Router {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap());
        let proxy = ChatProxy::new(Arc::new(client), RateLimiter::with_defaults(Arc::new(clock)));
        router(Arc::new(proxy))
    }

    fn post(body: &str, user: Option<&str>) -> Request<Body> {
        let mut req = Request::post(CHAT_PATH).header(header::CONTENT_TYPE, "application/json");
        if let Some(u) = user {
            req = req.header(USER_HEADER, u);
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn answers_in_camel_case() {
        let app = app(FakeClient::default());
        let (status, body) = send(
            &app,
            post(&json!({"message": "squat tips?", "feature": "form-tips"}).to_string(), None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "echo: squat tips?");
        assert_eq!(body["messageId"], "msg_test");
        assert_eq!(body["usage"]["inputTokens"], 1);
    }

    #[tokio::test]
    async fn bad_bodies_are_400() {
        let app = app(FakeClient::default());
        let (status, body) = send(&app, post("not json", None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid message");

        let long = "x".repeat(2001);
        let (status, body) = send(&app, post(&json!({"message": long}).to_string(), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Message too long (max 2000 characters)");
    }

    #[tokio::test]
    async fn eleventh_call_per_user_is_429() {
        let app = app(FakeClient::default());
        let body = json!({"message": "hi"}).to_string();
        for _ in 0..10 {
            let (status, _) = send(&app, post(&body, Some("alice"))).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, res) = send(&app, post(&body, Some("alice"))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res["error"], "Rate limit exceeded. Please wait a moment.");

        let (status, _) = send(&app, post(&body, None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_credentials_surface_as_generic_500() {
        let app = app(FakeClient {
            fail_with: Some(401),
            ..Default::default()
        });
        let (status, body) = send(&app, post(&json!({"message": "hi"}).to_string(), None)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to generate response. Please try again.");
    }
}
