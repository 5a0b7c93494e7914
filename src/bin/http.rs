// greet-bench-http — latency benchmark client for the HTTP greet endpoint
//
// Opens N pooled HTTP channels against /hello/greeting and keeps
// channels × outstanding_calls requests in flight until the deadline,
// reporting percentile latency and throughput. With `blocking true` each
// worker runs a synchronous request loop on its own thread instead of an
// asynchronously resubmitting pipeline.
//
// Usage:
//   greet-bench-http address http://localhost:8080 channels 4 \
//       outstanding_calls 10 blocking false connections 10 \
//       warmup_duration 10 duration 60

use greet_bench::{config::HttpConfig, driver, http::GreetHttpClient, report, GREET_NAME};
use tokio::runtime::Handle;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!(
        r#"greet-bench-http — latency benchmark client for the HTTP greet endpoint

USAGE:
    greet-bench-http [KEY VALUE]...

KEYS:
    address <URL>              Target base URL       [default: http://localhost:8080]
    channels <N>               HTTP clients          [default: 4]
    outstanding_calls <N>      In-flight calls per channel  [default: 10]
    blocking <BOOL>            Thread-per-worker synchronous pipelines
                                                     [default: false]
    connections <N>            Pool size per channel [default: 10]
    warmup_duration <SECS>     Discarded warmup pass [default: 10]
    duration <SECS>            Measured pass         [default: 60]

Unknown keys are ignored."#
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greet_bench=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "help" || a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let config = match HttpConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            print_usage();
            std::process::exit(2);
        }
    };

    info!(
        "greet-bench-http: {} channels x {} outstanding calls against {} (blocking={})",
        config.channels, config.outstanding_calls, config.address, config.blocking
    );

    let mut clients = Vec::with_capacity(config.channels);
    for _ in 0..config.channels {
        clients.push(GreetHttpClient::new(&config, GREET_NAME).map_err(driver::BenchError::Client)?);
    }

    let outcome = if config.blocking {
        let handle = Handle::current();
        driver::run_benchmark_blocking(
            clients,
            config.outstanding_calls,
            config.warmup,
            config.duration,
            move |client: GreetHttpClient| {
                let handle = handle.clone();
                move || handle.block_on(client.greet()).map(|_| ())
            },
        )
        .await?
    } else {
        driver::run_benchmark(
            clients,
            config.outstanding_calls,
            config.warmup,
            config.duration,
            |client: GreetHttpClient| {
                move || {
                    let client = client.clone();
                    async move { client.greet().await.map(|_| ()) }
                }
            },
        )
        .await?
    };

    print!("{}", report::http_report(&config, &outcome));

    Ok(())
}
