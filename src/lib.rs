pub mod config;
pub mod driver;
pub mod http;
pub mod latency;
pub mod pipeline;
pub mod report;
pub mod rpc;
pub mod wire;

pub use config::{ConfigError, HttpConfig, RpcConfig};
pub use driver::{run_benchmark, run_benchmark_blocking, BenchError, BenchOutcome};
pub use http::GreetHttpClient;
pub use latency::LatencyHistogram;
pub use pipeline::RequestError;
pub use report::Report;
pub use rpc::GreetClient;

/// Name sent with every greet request; the payload content is irrelevant to
/// the measurement, it just has to be a valid request.
pub const GREET_NAME: &str = "bench";
