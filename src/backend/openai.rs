//! OpenAI-compatible chat-completions backend.

use super::{CompletionRequest, GenerationBackend, TextStream};
use crate::config::ProviderConfig;
use crate::error::FeedbackError;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use futures_util::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<AssistantMessage>,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChunkResponse {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

pub struct OpenAiBackend {
    client: reqwest::Client,
    // Fixed at construction; the rest of the config may be swapped later.
    name: String,
    // Swappable so credentials can rotate without rebuilding the service.
    config: ArcSwap<ProviderConfig>,
}

impl OpenAiBackend {
    pub fn new(config: ProviderConfig) -> Result<Self, FeedbackError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| FeedbackError::Configuration(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            name: config.name.clone(),
            config: ArcSwap::from_pointee(config),
        })
    }

    pub fn config(&self) -> Arc<ProviderConfig> {
        self.config.load_full()
    }

    pub fn update_config(&self, config: ProviderConfig) {
        self.config.store(Arc::new(config));
    }

    async fn send(
        &self,
        cfg: &ProviderConfig,
        request: &CompletionRequest,
        stream: bool,
    ) -> Result<reqwest::Response, FeedbackError> {
        let api_key = cfg
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| FeedbackError::Configuration("API key not configured".into()))?;

        let body = ChatRequest {
            model: &cfg.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        };

        let url = format!("{}/chat/completions", cfg.endpoint.trim_end_matches('/'));
        let mut builder = self.client.post(&url).bearer_auth(api_key).json(&body);
        // A whole-request timeout would cut long streams short.
        if !stream {
            builder = builder.timeout(cfg.request_timeout);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| FeedbackError::from_reqwest(e, cfg.request_timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(FeedbackError::from_status(status.as_u16(), &text));
        }
        Ok(resp)
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, FeedbackError> {
        let cfg = self.config.load_full();
        debug!(model = %cfg.model, endpoint = %cfg.endpoint, "sending completion request");
        let resp = self.send(&cfg, request, false).await?;
        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| FeedbackError::from_reqwest(e, cfg.request_timeout))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default())
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TextStream, FeedbackError> {
        let cfg = self.config.load_full();
        debug!(model = %cfg.model, endpoint = %cfg.endpoint, "opening completion stream");
        let resp = self.send(&cfg, request, true).await?;
        Ok(sse_text_stream(resp.bytes_stream()))
    }
}

enum SseLine {
    Text(String),
    Error(FeedbackError),
    Done,
    Skip,
}

fn parse_sse_line(raw: &[u8]) -> SseLine {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    let Some(payload) = line.strip_prefix("data:").map(str::trim_start) else {
        // Blank separators, comments, and event/id fields.
        return SseLine::Skip;
    };
    if payload == "[DONE]" {
        return SseLine::Done;
    }

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => return SseLine::Error(FeedbackError::Stream(format!("bad chunk: {}", e))),
    };
    if let Some(err) = value.get("error") {
        let message = err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("backend reported an error")
            .to_string();
        return SseLine::Error(FeedbackError::Stream(message));
    }
    match serde_json::from_value::<ChunkResponse>(value) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|t| !t.is_empty())
            .map_or(SseLine::Skip, SseLine::Text),
        Err(e) => SseLine::Error(FeedbackError::Stream(format!("bad chunk: {}", e))),
    }
}

struct SseState<S> {
    inner: Pin<Box<S>>,
    buf: Vec<u8>,
    eof: bool,
    done: bool,
}

/// Turns a server-sent-events byte stream of chat-completion chunks into a
/// stream of text deltas. Lines are split on raw bytes so multi-byte
/// characters spanning network chunks stay intact.
pub(crate) fn sse_text_stream<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let state = SseState {
        inner: Box::pin(bytes),
        buf: Vec::new(),
        eof: false,
        done: false,
    };
    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if st.done {
                return None;
            }
            if let Some(pos) = st.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = st.buf.drain(..=pos).collect();
                match parse_sse_line(&line) {
                    SseLine::Skip => continue,
                    SseLine::Text(text) => return Some((Ok(text), st)),
                    SseLine::Done => return None,
                    SseLine::Error(e) => {
                        st.done = true;
                        return Some((Err(e), st));
                    }
                }
            }
            if st.eof {
                return None;
            }
            match st.inner.next().await {
                Some(Ok(chunk)) => st.buf.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(FeedbackError::Stream(e.to_string())), st));
                }
                None => {
                    st.eof = true;
                    if !st.buf.is_empty() {
                        st.buf.push(b'\n');
                    }
                }
            }
        }
    }))
}
