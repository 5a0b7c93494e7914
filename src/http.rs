//! HTTP transport for the greet benchmark.
//!
//! One `GreetHttpClient` corresponds to one benchmark channel and carries
//! its own connection pool, sized by the `connections` knob. The client is
//! cheap to clone; clones share the pool.

use crate::config::HttpConfig;
use crate::pipeline::RequestError;
use std::time::Duration;

/// Client read timeout; a greet call slower than this has failed anyway.
const READ_TIMEOUT: Duration = Duration::from_secs(60);

const KEEPALIVE: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct GreetHttpClient {
    client: reqwest::Client,
    url: String,
}

impl GreetHttpClient {
    /// Build one channel's client against `config.address`.
    pub fn new(config: &HttpConfig, name: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(READ_TIMEOUT)
            .pool_max_idle_per_host(config.connections)
            .tcp_keepalive(KEEPALIVE)
            .build()?;

        let url = format!(
            "{}/hello/greeting?name={}",
            config.address.trim_end_matches('/'),
            name
        );

        Ok(Self { client, url })
    }

    /// Issue one greet request and read the reply body.
    ///
    /// The body is always consumed so the connection goes back to the pool.
    /// A non-2xx status aborts the call.
    pub async fn greet(&self) -> Result<String, RequestError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            // Drain before reporting so the connection is reusable
            let _ = response.bytes().await;
            return Err(RequestError::HttpStatus(status));
        }

        Ok(response.text().await?)
    }
}
