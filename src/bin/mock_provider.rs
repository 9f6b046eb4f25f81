//! OpenAI-compatible stand-in for local runs of the feedback gateway.
//!
//! Usage: `mock_provider [port] [latency_ms] [error_rate]`

use anyhow::Context;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures_util::{stream, StreamExt};
use rand::Rng;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::sleep;

const CANNED_FEEDBACK: &str = "<p><strong>Overall</strong>, this has been a steady period with consistent effort.</p>\
<ul><li>Assignments are completed on time.</li><li>Quiz scores show a solid grasp of the material.</li></ul>\
<p>Keep reviewing mistakes after each test to lift the average further.</p>";

#[derive(Clone)]
struct ServerConfig {
    latency_ms: u64,
    error_rate: f64,
}

fn arg<T: std::str::FromStr>(args: &[String], idx: usize, default: T) -> anyhow::Result<T> {
    match args.get(idx) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("argument {} is malformed: {}", idx, raw)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let port: u16 = arg(&args, 1, 3001)?;
    let latency_ms: u64 = arg(&args, 2, 200)?;
    let error_rate: f64 = arg(&args, 3, 0.0)?;

    let config = ServerConfig { latency_ms, error_rate };

    let app = Router::new()
        .route("/chat/completions", post(handler))
        .route("/v1/chat/completions", post(handler))
        .with_state(config);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!(
        "Mock provider running on localhost:{}. Latency: {}ms, Error Rate: {}",
        port, latency_ms, error_rate
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn handler(State(config): State<ServerConfig>, Json(req): Json<Value>) -> Response {
    let jitter = rand::thread_rng().gen_range(0..=20);
    sleep(Duration::from_millis(config.latency_ms + jitter)).await;

    if config.error_rate > 0.0 && rand::thread_rng().gen_bool(config.error_rate) {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": {"message": "simulated overload", "type": "server_error"}})),
        )
            .into_response();
    }

    let model = req
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or("gpt-4o-mini")
        .to_string();

    if req.get("stream").and_then(Value::as_bool).unwrap_or(false) {
        return stream_response(model);
    }

    Json(json!({
        "id": "mock-completion",
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "model": model,
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": CANNED_FEEDBACK },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 600, "completion_tokens": 90, "total_tokens": 690 }
    }))
    .into_response()
}

fn stream_response(model: String) -> Response {
    let mut events: Vec<String> = CANNED_FEEDBACK
        .split_inclusive(' ')
        .map(|word| {
            let chunk = json!({
                "object": "chat.completion.chunk",
                "model": model,
                "choices": [{ "index": 0, "delta": { "content": word } }]
            });
            format!("data: {}\n\n", chunk)
        })
        .collect();
    events.push("data: [DONE]\n\n".to_string());

    let body = stream::iter(events).then(|event| async move {
        sleep(Duration::from_millis(15)).await;
        Ok::<_, Infallible>(event)
    });

    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(body),
    )
        .into_response()
}
