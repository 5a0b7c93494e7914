// greet-bench-rpc — latency benchmark client for the binary greet protocol
//
// Opens N multiplexed TCP channels to a greet server and keeps
// channels × outstanding_rpcs requests in flight until the deadline,
// reporting percentile latency and throughput.
//
// Usage:
//   greet-bench-rpc address localhost:8980 channels 4 outstanding_rpcs 10 \
//       warmup_duration 10 duration 60

use greet_bench::{config::RpcConfig, driver, report, rpc::GreetClient, GREET_NAME};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn print_usage() {
    eprintln!(
        r#"greet-bench-rpc — latency benchmark client for the binary greet protocol

USAGE:
    greet-bench-rpc [KEY VALUE]...

KEYS:
    address <HOST:PORT>        Target server (required)
    channels <N>               Connections to open          [default: 4]
    outstanding_rpcs <N>       In-flight rpcs per channel   [default: 10]
    warmup_duration <SECS>     Discarded warmup pass        [default: 10]
    duration <SECS>            Measured pass                [default: 60]

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

    let config = match RpcConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            print_usage();
            std::process::exit(2);
        }
    };

    info!(
        "greet-bench-rpc: {} channels x {} outstanding rpcs against {}",
        config.channels, config.outstanding_rpcs, config.address
    );

    let mut connections = Vec::with_capacity(config.channels);
    for _ in 0..config.channels {
        let client = GreetClient::connect(&config.address)
            .await
            .map_err(driver::BenchError::Connect)?;
        connections.push(client);
    }

    let outcome = driver::run_benchmark(
        connections,
        config.outstanding_rpcs,
        config.warmup,
        config.duration,
        |client: GreetClient| {
            move || {
                let client = client.clone();
                async move { client.greet(GREET_NAME).await.map(|_| ()) }
            }
        },
    )
    .await?;

    print!("{}", report::rpc_report(&config, &outcome));

    Ok(())
}
