//! Benchmark orchestration: warmup pass, timed measurement pass, histogram
//! collection and merge.
//!
//! The driver is generic over the transport. It takes the already-opened
//! connections plus a factory that turns one connection into a per-slot
//! issuer closure, and spawns `connections.len() * outstanding` pipelines
//! bound round-robin to the connections.

use crate::latency::LatencyHistogram;
use crate::pipeline::{self, RequestError};
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("failed to connect: {0}")]
    Connect(#[source] std::io::Error),
    #[error("failed to build client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request pipeline failed: {0}")]
    Request(#[from] RequestError),
    #[error("worker task panicked: {0}")]
    WorkerPanic(String),
}

/// The merged result of a measurement pass.
#[derive(Debug)]
pub struct BenchOutcome {
    pub histogram: LatencyHistogram,
    pub elapsed: Duration,
}

/// Run the full benchmark: a warmup pass whose histograms are discarded,
/// then a timed measurement pass.
///
/// `mk` builds one issuer closure per worker slot from a clone of the slot's
/// connection. Any worker error fails the run with that error; results from
/// workers that had already finished are not salvaged.
pub async fn run_benchmark<C, MkW, W, Fut>(
    connections: Vec<C>,
    outstanding: usize,
    warmup: Duration,
    duration: Duration,
    mk: MkW,
) -> Result<BenchOutcome, BenchError>
where
    C: Clone + Send + Sync + 'static,
    MkW: Fn(C) -> W,
    W: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), RequestError>> + Send + 'static,
{
    if !warmup.is_zero() {
        info!("warmup: {}s", warmup.as_secs_f64());
        let deadline = Instant::now() + warmup;
        let _ = run_phase(&connections, outstanding, deadline, &mk).await?;
    }

    info!(
        "measuring: {} workers for {}s",
        connections.len() * outstanding,
        duration.as_secs_f64()
    );
    let start = Instant::now();
    let deadline = start + duration;
    let histograms = run_phase(&connections, outstanding, deadline, &mk).await?;
    let elapsed = start.elapsed();

    Ok(BenchOutcome {
        histogram: merge_all(histograms),
        elapsed,
    })
}

/// Blocking-pipeline variant of [`run_benchmark`]: each worker runs a
/// synchronous issue-wait loop on its own dedicated blocking thread.
pub async fn run_benchmark_blocking<C, MkW, W>(
    connections: Vec<C>,
    outstanding: usize,
    warmup: Duration,
    duration: Duration,
    mk: MkW,
) -> Result<BenchOutcome, BenchError>
where
    C: Clone + Send + Sync + 'static,
    MkW: Fn(C) -> W,
    W: FnMut() -> Result<(), RequestError> + Send + 'static,
{
    if !warmup.is_zero() {
        info!("warmup: {}s", warmup.as_secs_f64());
        let deadline = Instant::now() + warmup;
        let _ = run_blocking_phase(&connections, outstanding, deadline, &mk).await?;
    }

    info!(
        "measuring: {} blocking workers for {}s",
        connections.len() * outstanding,
        duration.as_secs_f64()
    );
    let start = Instant::now();
    let deadline = start + duration;
    let histograms = run_blocking_phase(&connections, outstanding, deadline, &mk).await?;
    let elapsed = start.elapsed();

    Ok(BenchOutcome {
        histogram: merge_all(histograms),
        elapsed,
    })
}

/// Spawn the worker topology against one deadline and collect every worker's
/// histogram, failing fast on the first worker error in spawn order.
async fn run_phase<C, MkW, W, Fut>(
    connections: &[C],
    outstanding: usize,
    deadline: Instant,
    mk: &MkW,
) -> Result<Vec<LatencyHistogram>, BenchError>
where
    C: Clone + Send + Sync + 'static,
    MkW: Fn(C) -> W,
    W: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), RequestError>> + Send + 'static,
{
    let mut handles = Vec::with_capacity(connections.len() * outstanding);
    for conn in connections {
        for _ in 0..outstanding {
            let issue = mk(conn.clone());
            handles.push(tokio::spawn(pipeline::run(issue, deadline)));
        }
    }
    debug!("spawned {} workers", handles.len());

    let mut histograms = Vec::with_capacity(handles.len());
    for handle in handles {
        let histogram = handle
            .await
            .map_err(|e| BenchError::WorkerPanic(e.to_string()))??;
        histograms.push(histogram);
    }
    Ok(histograms)
}

async fn run_blocking_phase<C, MkW, W>(
    connections: &[C],
    outstanding: usize,
    deadline: Instant,
    mk: &MkW,
) -> Result<Vec<LatencyHistogram>, BenchError>
where
    C: Clone + Send + Sync + 'static,
    MkW: Fn(C) -> W,
    W: FnMut() -> Result<(), RequestError> + Send + 'static,
{
    let mut handles = Vec::with_capacity(connections.len() * outstanding);
    for conn in connections {
        for _ in 0..outstanding {
            let issue = mk(conn.clone());
            handles.push(tokio::task::spawn_blocking(move || {
                pipeline::run_blocking(issue, deadline)
            }));
        }
    }
    debug!("spawned {} blocking workers", handles.len());

    let mut histograms = Vec::with_capacity(handles.len());
    for handle in handles {
        let histogram = handle
            .await
            .map_err(|e| BenchError::WorkerPanic(e.to_string()))??;
        histograms.push(histogram);
    }
    Ok(histograms)
}

fn merge_all(histograms: Vec<LatencyHistogram>) -> LatencyHistogram {
    let mut merged = LatencyHistogram::new();
    for histogram in &histograms {
        merged.merge(histogram);
    }
    merged
}
