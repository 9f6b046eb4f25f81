//! Starts a mock provider and the gateway, then fires a burst of feedback
//! requests at it. Half of them share one snapshot, so after the first
//! completes the rest should be served from the cache.

use anyhow::Context;
use serde_json::{json, Value};
use std::process::{Child, Command};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::task;

const GATEWAY: &str = "http://127.0.0.1:8080";
const REQUESTS: usize = 40;

// Kills children on exit.
struct ProcessGuard(Child);
impl Drop for ProcessGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
    }
}

fn snapshot(name: &str, grade_average: f64) -> Value {
    let kind = |total: u32, completed: u32, average: f64| {
        json!({
            "total": total, "completed": completed,
            "completionRate": completed as f64 / total as f64 * 100.0,
            "averageGrade": average
        })
    };
    json!({
        "student": { "name": name },
        "period": { "startDate": "2024-03-01", "endDate": "2024-03-31" },
        "metrics": {
            "overall": {
                "gradeAverage": grade_average, "totalAssignments": 20,
                "completedAssignments": 18, "completionRate": 90.0
            },
            "attendance": { "present": 18, "total": 20, "rate": 90.0 },
            "byType": {
                "quiz": kind(6, 6, grade_average),
                "homework": kind(8, 7, grade_average - 2.0),
                "test": kind(4, 3, grade_average + 1.0),
                "project": kind(2, 2, grade_average)
            }
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("Starting simulation...");

    // Assumes the binaries were built by a previous `cargo build`.
    let _provider = ProcessGuard(
        Command::new("./target/debug/mock_provider")
            .args(["3001", "300", "0.1"])
            .spawn()
            .context("starting mock provider")?,
    );
    let _gateway = ProcessGuard(
        Command::new("./target/debug/feedback-edge")
            .env("OPENAI_BASE_URL", "http://127.0.0.1:3001")
            .env("OPENAI_API_KEY", "sk-mock")
            .env("FEEDBACK_RATE_LIMIT_PER_MINUTE", "0")
            .spawn()
            .context("starting gateway")?,
    );

    println!("Provider on 3001, gateway on 8080. Waiting 3s for startup...");
    thread::sleep(Duration::from_secs(3));

    let client = reqwest::Client::new();

    // Prime the cache so the shared snapshot is a guaranteed hit below.
    let primed = client
        .post(format!("{}/api/reports/generate-feedback", GATEWAY))
        .json(&json!({ "snapshot": snapshot("Shared Student", 87.0), "template": "focused" }))
        .send()
        .await
        .context("priming request")?;
    println!("Priming request: {}", primed.status());

    println!("Starting load test ({} concurrent requests)...", REQUESTS);
    let ok = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let mut tasks = Vec::new();
    for i in 0..REQUESTS {
        let client = client.clone();
        let ok = ok.clone();
        let errors = errors.clone();
        let body = if i < REQUESTS / 2 {
            json!({ "snapshot": snapshot("Shared Student", 87.0), "template": "focused" })
        } else {
            json!({
                "snapshot": snapshot(&format!("Student {}", i), 70.0 + i as f64 / 2.0),
                "template": "encouraging",
                "language": if i % 2 == 0 { "english" } else { "korean" }
            })
        };

        tasks.push(task::spawn(async move {
            let sent = client
                .post(format!("{}/api/reports/generate-feedback", GATEWAY))
                .json(&body)
                .send()
                .await;
            match sent {
                Ok(resp) if resp.status().is_success() => ok.fetch_add(1, Ordering::Relaxed),
                _ => errors.fetch_add(1, Ordering::Relaxed),
            };
        }));
    }
    for t in tasks {
        let _ = t.await;
    }
    let duration = start.elapsed();

    let report: Value = client
        .get(format!("{}/api/reports/feedback-cache", GATEWAY))
        .send()
        .await?
        .json()
        .await?;

    println!("--- Results ---");
    println!("Total Requests: {}", REQUESTS);
    println!("Success: {}", ok.load(Ordering::Relaxed));
    println!("Errors: {}", errors.load(Ordering::Relaxed));
    println!("Total Time: {:?}", duration);
    println!("RPS: {:.2}", REQUESTS as f64 / duration.as_secs_f64());
    println!("Cache entries: {}", report["cache"]["total_entries"]);
    println!(
        "Backend calls: {} (errors {})",
        report["backendStats"]["request_count"], report["backendStats"]["error_count"]
    );
    Ok(())
}
