//! The request pipeline: one logical in-flight slot driven until a deadline.
//!
//! Each pipeline keeps exactly one request outstanding, measures the time
//! between consecutive completions, and immediately re-issues. Many
//! pipelines share one connection; the transport is responsible for
//! multiplexing them.

use crate::latency::LatencyHistogram;
use std::future::Future;
use std::time::Instant;
use thiserror::Error;

/// Why a single request, and with it the owning pipeline, failed.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("wire protocol error: {0}")]
    Wire(#[from] crate::wire::WireError),
    #[error("server rejected request: {0}")]
    Rejected(String),
    #[error("connection closed: {0}")]
    ConnectionClosed(String),
}

/// Drive one request slot until `deadline`.
///
/// `issue` performs a single request round trip. On each completion the
/// elapsed time since the previous completion (initially since the pipeline
/// started) is recorded in microseconds, and a new request is issued
/// immediately while the deadline has not passed. The deadline is only
/// consulted between requests, so the pipeline may overrun it by up to one
/// request's latency.
///
/// The first error aborts the pipeline; there is no retry.
pub async fn run<W, Fut>(mut issue: W, deadline: Instant) -> Result<LatencyHistogram, RequestError>
where
    W: FnMut() -> Fut,
    Fut: Future<Output = Result<(), RequestError>>,
{
    let mut histogram = LatencyHistogram::new();
    let mut last_completion = Instant::now();

    loop {
        issue().await?;

        let now = Instant::now();
        histogram.record_nanos(now.duration_since(last_completion).as_nanos() as u64);
        last_completion = now;

        if now >= deadline {
            return Ok(histogram);
        }
    }
}

/// Blocking variant of [`run`] with identical recording semantics.
///
/// `issue` waits synchronously for its reply, so the pipeline occupies its
/// thread for each request's full round trip. Intended to run on a dedicated
/// blocking thread, one per worker.
pub fn run_blocking<W>(mut issue: W, deadline: Instant) -> Result<LatencyHistogram, RequestError>
where
    W: FnMut() -> Result<(), RequestError>,
{
    let mut histogram = LatencyHistogram::new();
    let mut last_completion = Instant::now();

    loop {
        issue()?;

        let now = Instant::now();
        histogram.record_nanos(now.duration_since(last_completion).as_nanos() as u64);
        last_completion = now;

        if now >= deadline {
            return Ok(histogram);
        }
    }
}
