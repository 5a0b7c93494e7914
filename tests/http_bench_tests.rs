mod common;

use common::StubBehavior;
use greet_bench::config::HttpConfig;
use greet_bench::driver::{self, BenchError};
use greet_bench::http::GreetHttpClient;
use greet_bench::pipeline::RequestError;
use greet_bench::GREET_NAME;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::runtime::Handle;

fn test_config(addr: SocketAddr, blocking: bool) -> HttpConfig {
    HttpConfig {
        address: format!("http://{}", addr),
        channels: 1,
        outstanding_calls: 2,
        blocking,
        connections: 10,
        warmup: Duration::ZERO,
        duration: Duration::from_millis(300),
    }
}

fn build_clients(config: &HttpConfig) -> Vec<GreetHttpClient> {
    (0..config.channels)
        .map(|_| GreetHttpClient::new(config, GREET_NAME).unwrap())
        .collect()
}

type CallFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), RequestError>> + Send>>;

fn issue(client: GreetHttpClient) -> impl FnMut() -> CallFuture + Send + 'static {
    move || {
        let client = client.clone();
        Box::pin(async move { client.greet().await.map(|_| ()) })
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_greet_roundtrip() {
    let addr = common::spawn_http_stub(StubBehavior::Reply {
        delay: Duration::ZERO,
    })
    .await;

    let config = test_config(addr, false);
    let client = GreetHttpClient::new(&config, "bench").unwrap();
    assert_eq!(client.greet().await.unwrap(), "Hello, bench!");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_async_pipelines_against_fixed_latency_target() {
    let addr = common::spawn_http_stub(StubBehavior::Reply {
        delay: Duration::from_millis(2),
    })
    .await;

    let config = test_config(addr, false);
    let outcome = driver::run_benchmark(
        build_clients(&config),
        config.outstanding_calls,
        config.warmup,
        config.duration,
        issue,
    )
    .await
    .unwrap();

    let count = outcome.histogram.total_count();
    assert!(count >= 20, "unexpected count {}", count);
    assert!(outcome.histogram.percentile(50.0) >= 2_000);
    assert!(outcome.elapsed >= config.duration);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_blocking_pipelines_record_same_shape() {
    let addr = common::spawn_http_stub(StubBehavior::Reply {
        delay: Duration::from_millis(2),
    })
    .await;

    let config = test_config(addr, true);
    let handle = Handle::current();
    let outcome = driver::run_benchmark_blocking(
        build_clients(&config),
        config.outstanding_calls,
        config.warmup,
        config.duration,
        move |client: GreetHttpClient| {
            let handle = handle.clone();
            move || handle.block_on(client.greet()).map(|_| ())
        },
    )
    .await
    .unwrap();

    let count = outcome.histogram.total_count();
    assert!(count >= 10, "unexpected count {}", count);
    assert!(outcome.histogram.percentile(50.0) >= 2_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_error_status_fails_the_run() {
    let addr = common::spawn_http_stub(StubBehavior::Fail).await;

    let config = HttpConfig {
        duration: Duration::from_secs(60),
        ..test_config(addr, false)
    };
    let result = driver::run_benchmark(
        build_clients(&config),
        config.outstanding_calls,
        config.warmup,
        config.duration,
        issue,
    )
    .await;

    match result {
        Err(BenchError::Request(RequestError::HttpStatus(status))) => {
            assert_eq!(status.as_u16(), 500);
        }
        other => panic!("expected http status error, got {:?}", other),
    }
}
