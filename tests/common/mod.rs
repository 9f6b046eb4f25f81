#![allow(dead_code)]

use async_trait::async_trait;
use feedback_edge::backend::{CompletionRequest, GenerationBackend, TextStream};
use feedback_edge::error::FeedbackError;
use feedback_edge::model::PerformanceSnapshot;
use futures_util::stream;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

fn kind(total: u32, completed: u32, average: f64) -> Value {
    json!({
        "total": total,
        "completed": completed,
        "completionRate": completed as f64 / total as f64 * 100.0,
        "averageGrade": average,
        "statuses": {
            "submitted": completed, "pending": total - completed,
            "overdue": 0, "notSubmitted": 0, "excused": 0
        }
    })
}

/// Alice's January report, as the host application would post it.
pub fn sample_json() -> Value {
    json!({
        "student": { "name": "Alice", "grade": "5" },
        "period": { "startDate": "2024-01-01", "endDate": "2024-01-31" },
        "metrics": {
            "overall": {
                "gradeAverage": 88.0,
                "totalAssignments": 25,
                "completedAssignments": 23,
                "completionRate": 92.0
            },
            "attendance": { "present": 19, "total": 20, "rate": 95.0 },
            "byType": {
                "quiz": kind(8, 8, 90.0),
                "homework": kind(10, 9, 85.0),
                "test": kind(4, 4, 88.0),
                "project": kind(3, 2, 92.0)
            }
        }
    })
}

pub fn sample_snapshot() -> PerformanceSnapshot {
    serde_json::from_value(sample_json()).expect("sample snapshot deserializes")
}

/// In-process backend that replays queued replies, then falls back to a
/// numbered canned completion.
#[derive(Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<Result<String, FeedbackError>>>,
    calls: AtomicU32,
    stream_calls: AtomicU32,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replies(replies: Vec<Result<String, FeedbackError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn stream_calls(&self) -> u32 {
        self.stream_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, FeedbackError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().unwrap() = Some(request.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => Ok(format!("<p>Feedback #{}</p>", n)),
        }
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<TextStream, FeedbackError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        let chunks: Vec<Result<String, FeedbackError>> = vec![
            Ok("<p>Live ".to_string()),
            Ok("feedback</p>".to_string()),
        ];
        Ok(Box::pin(stream::iter(chunks)))
    }
}
