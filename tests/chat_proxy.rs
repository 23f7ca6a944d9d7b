use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{Duration, TimeZone, Utc};
use ironlog::{
    ai::{
        ChatHistory, ChatProxy, ChatResponse, Completion, LlmClient, RateLimiter, Role, Usage,
        server::{CHAT_PATH, USER_HEADER, router},
    },
    clock::{Clock, ManualClock},
    error::ChatError,
    kv::FileStore,
};
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Completion>>,
}

#[async_trait]
impl LlmClient for Recorder {
    async fn complete(&self, request: &Completion) -> Result<ChatResponse, ChatError> {
        self.seen.lock().unwrap().push(request.clone());
        Ok(ChatResponse {
            message: format!("{} turns", request.messages.len()),
            message_id: "msg_1".into(),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 3,
            },
        })
    }
}

fn setup() -> (Router, Arc<Recorder>, ManualClock) {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap());
    let client = Arc::new(Recorder::default());
    let proxy = ChatProxy::new(
        client.clone(),
        RateLimiter::with_defaults(Arc::new(clock.clone())),
    );
    (router(Arc::new(proxy)), client, clock)
}

async fn post(app: &Router, user: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut req = Request::post(CHAT_PATH).header(header::CONTENT_TYPE, "application/json");
    if let Some(u) = user {
        req = req.header(USER_HEADER, u);
    }
    let res = app
        .clone()
        .oneshot(req.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn context_and_history_reach_the_model_in_order() {
    let (app, client, _) = setup();
    let history: Vec<Value> = (0..14)
        .map(|i| {
            json!({
                "role": if i % 2 == 0 { "user" } else { "assistant" },
                "content": format!("turn {i}")
            })
        })
        .collect();

    let (status, body) = post(
        &app,
        Some("u1"),
        json!({
            "message": "What next?",
            "feature": "workout-analysis",
            "context": {
                "profile": { "experience_level": "beginner", "primary_goal": "strength" },
                "recentWorkouts": [{ "name": "Push", "date": "2026-03-13", "exercises": [] }]
            },
            "conversationHistory": history
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    // Context turn, ten history turns, the message.
    assert_eq!(body["message"], "12 turns");
    assert_eq!(body["messageId"], "msg_1");
    assert_eq!(body["usage"]["inputTokens"], 10);

    let seen = client.seen.lock().unwrap();
    let turns = &seen[0].messages;
    assert!(turns[0].content.starts_with("Context Information:\n"));
    assert_eq!(turns[1].content, "turn 4");
    assert_eq!(turns[11].content, "What next?");
}

#[tokio::test]
async fn eleventh_request_in_a_minute_is_rejected() {
    let (app, client, clock) = setup();

    for _ in 0..10 {
        let (status, _) = post(&app, Some("busy"), json!({ "message": "hi" })).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = post(&app, Some("busy"), json!({ "message": "hi" })).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "Rate limit exceeded. Please wait a moment.");

    // Other callers have their own window, and the window slides.
    let (status, _) = post(&app, None, json!({ "message": "hi" })).await;
    assert_eq!(status, StatusCode::OK);
    clock.advance(Duration::seconds(61));
    let (status, _) = post(&app, Some("busy"), json!({ "message": "hi" })).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(client.seen.lock().unwrap().len(), 12);
}

#[tokio::test]
async fn bad_messages_never_reach_the_model() {
    let (app, client, _) = setup();

    let (status, body) = post(&app, None, json!({ "message": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid message");

    let (status, body) = post(&app, None, json!({ "message": "x".repeat(2001) })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Message too long (max 2000 characters)");

    let (status, _) = post(&app, None, json!({ "message": "é".repeat(2000) })).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(client.seen.lock().unwrap().len(), 1);
}

#[test]
fn local_history_keeps_the_newest_fifty_across_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 0, 0).unwrap());

    let mut history = ChatHistory::load(Box::new(FileStore::open(dir.path()).unwrap())).unwrap();
    for i in 0..60 {
        let role = if i % 2 == 0 { Role::User } else { Role::Assistant };
        history.push(role, format!("m{i}"), None, clock.now()).unwrap();
        assert!(history.len() <= 50);
    }

    let reloaded = ChatHistory::load(Box::new(FileStore::open(dir.path()).unwrap())).unwrap();
    let contents: Vec<_> = reloaded.messages().map(|m| m.content.as_str()).collect();
    assert_eq!(contents.len(), 50);
    assert_eq!(contents.first(), Some(&"m10"));
    assert_eq!(contents.last(), Some(&"m59"));
}
