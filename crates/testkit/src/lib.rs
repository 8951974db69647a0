//! Stub OTLP/HTTP collector for tests. Decodes and records every request it
//! receives on `/v1/traces` and `/v1/logs`.

use std::io::Read;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use flate2::read::GzDecoder;
use opentelemetry_proto::tonic::collector::logs::v1::ExportLogsServiceRequest;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::logs::v1::LogRecord;
use opentelemetry_proto::tonic::trace::v1::Span;
use prost::Message;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Recorded {
    traces: Vec<ExportTraceServiceRequest>,
    logs: Vec<ExportLogsServiceRequest>,
    last_headers: HeaderMap,
}

#[derive(Clone, Default)]
struct CollectorState {
    recorded: Arc<Mutex<Recorded>>,
    failing: Arc<AtomicBool>,
}

pub struct StubCollector {
    addr: SocketAddr,
    state: CollectorState,
    task: JoinHandle<()>,
}

impl StubCollector {
    pub async fn start() -> anyhow::Result<Self> {
        let state = CollectorState::default();
        let app = Router::new()
            .route("/v1/traces", post(export_traces))
            .route("/v1/logs", post(export_logs))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { addr, state, task })
    }

    /// Base URL, without a signal path.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// While failing, every request is answered with 503 and not recorded.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn trace_requests(&self) -> Vec<ExportTraceServiceRequest> {
        self.with_recorded(|r| r.traces.clone())
    }

    pub fn log_requests(&self) -> Vec<ExportLogsServiceRequest> {
        self.with_recorded(|r| r.logs.clone())
    }

    pub fn spans(&self) -> Vec<Span> {
        self.trace_requests()
            .into_iter()
            .flat_map(|req| req.resource_spans)
            .flat_map(|rs| rs.scope_spans)
            .flat_map(|ss| ss.spans)
            .collect()
    }

    pub fn logs(&self) -> Vec<LogRecord> {
        self.log_requests()
            .into_iter()
            .flat_map(|req| req.resource_logs)
            .flat_map(|rl| rl.scope_logs)
            .flat_map(|sl| sl.log_records)
            .collect()
    }

    pub fn last_header(&self, name: &str) -> Option<String> {
        self.with_recorded(|r| {
            r.last_headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
    }

    pub async fn wait_for_spans(&self, n: usize, timeout: Duration) -> Vec<Span> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let spans = self.spans();
            if spans.len() >= n || tokio::time::Instant::now() >= deadline {
                return spans;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    pub async fn wait_for_logs(&self, n: usize, timeout: Duration) -> Vec<LogRecord> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let logs = self.logs();
            if logs.len() >= n || tokio::time::Instant::now() >= deadline {
                return logs;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    fn with_recorded<T>(&self, f: impl FnOnce(&Recorded) -> T) -> T {
        let guard = self
            .state
            .recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }
}

impl Drop for StubCollector {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// String body of a log record, or empty for non-string bodies.
pub fn body_text(record: &LogRecord) -> String {
    match record.body.as_ref().and_then(|b| b.value.as_ref()) {
        Some(Value::StringValue(s)) => s.clone(),
        _ => String::new(),
    }
}

async fn export_traces(
    State(state): State<CollectorState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if state.failing.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    let Some(body) = decompress(&headers, body) else {
        return StatusCode::BAD_REQUEST;
    };
    let Ok(req) = ExportTraceServiceRequest::decode(body.as_slice()) else {
        return StatusCode::BAD_REQUEST;
    };
    record(&state, headers, |r| r.traces.push(req));
    StatusCode::OK
}

async fn export_logs(
    State(state): State<CollectorState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if state.failing.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    let Some(body) = decompress(&headers, body) else {
        return StatusCode::BAD_REQUEST;
    };
    let Ok(req) = ExportLogsServiceRequest::decode(body.as_slice()) else {
        return StatusCode::BAD_REQUEST;
    };
    record(&state, headers, |r| r.logs.push(req));
    StatusCode::OK
}

fn record(state: &CollectorState, headers: HeaderMap, f: impl FnOnce(&mut Recorded)) {
    let mut guard = state
        .recorded
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.last_headers = headers;
    f(&mut guard);
}

fn decompress(headers: &HeaderMap, body: Bytes) -> Option<Vec<u8>> {
    let gzip = headers
        .get("content-encoding")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));
    if !gzip {
        return Some(body.to_vec());
    }
    let mut out = Vec::new();
    GzDecoder::new(body.as_ref()).read_to_end(&mut out).ok()?;
    Some(out)
}
