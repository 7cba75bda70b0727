//! Shared test fixtures and helpers.
//!
//! Provides reusable constructors for domain types and a fake market-data
//! upstream used across multiple test modules.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::routing::get;
use chrono::{DateTime, TimeZone, Utc};

use crate::types::Rate;

/// Midnight UTC on the given date.
pub(crate) fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

/// `Rate { ask: 10.0, bid: 9.5, timestamp: 2025-07-24T00:00:00Z }`.
pub(crate) fn rate() -> Rate {
    Rate::new(10.0, 9.5, ts(2025, 7, 24))
}

// ---------------------------------------------------------------------------
// Fake upstream
// ---------------------------------------------------------------------------

/// One-level Grinex depth snapshot (production field set).
pub(crate) const GRINEX_DEPTH_JSON: &str = r#"{
    "timestamp": 1753315200,
    "asks": [{"price": "100.5", "volume": "1", "amount": "100.5", "factor": "1", "type": "ask"}],
    "bids": [{"price": "99.5", "volume": "1", "amount": "99.5", "factor": "1", "type": "bid"}]
}"#;

#[derive(Clone)]
struct UpstreamState {
    queries: Arc<Mutex<Vec<Option<String>>>>,
    status: StatusCode,
    body: &'static str,
}

/// Local HTTP server answering every depth request with a fixed response
/// and recording each request's query string.
pub(crate) struct FakeUpstream {
    pub url: String,
    queries: Arc<Mutex<Vec<Option<String>>>>,
}

impl FakeUpstream {
    pub(crate) async fn start(status: StatusCode, body: &'static str) -> Self {
        let queries = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/api/v2/depth", get(depth))
            .with_state(UpstreamState {
                queries: queries.clone(),
                status,
                body,
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        Self {
            url: format!("http://{addr}/api/v2/depth"),
            queries,
        }
    }

    /// Query strings of all requests received so far, in arrival order.
    pub(crate) fn queries(&self) -> Vec<Option<String>> {
        self.queries.lock().unwrap().clone()
    }
}

async fn depth(
    State(state): State<UpstreamState>,
    RawQuery(query): RawQuery,
) -> (StatusCode, &'static str) {
    state.queries.lock().unwrap().push(query);
    (state.status, state.body)
}

/// URL of a local port with nothing listening on it.
pub(crate) async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api/v2/depth")
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

/// In-memory sink for `tracing` output. Install per test with
/// `tracing::subscriber::set_default(logs.subscriber())`.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub(crate) fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + use<> {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish()
    }

    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
