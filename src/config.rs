//! Benchmark configuration parsed from an alternating key/value argument
//! list, e.g. `address localhost:8980 channels 4 outstanding_rpcs 10`.
//!
//! Even-indexed arguments are keys, odd-indexed are values. Unknown keys are
//! ignored; an absent key takes its default. A value that is present but does
//! not parse is a fatal configuration error, surfaced before any connection
//! is opened.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_CHANNELS: usize = 4;
pub const DEFAULT_OUTSTANDING: usize = 10;
pub const DEFAULT_WARMUP_SECS: u64 = 10;
pub const DEFAULT_DURATION_SECS: u64 = 60;
pub const DEFAULT_HTTP_CONNECTIONS: usize = 10;
pub const DEFAULT_HTTP_ADDRESS: &str = "http://localhost:8080";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required key '{0}'")]
    MissingKey(&'static str),
    #[error("invalid value for '{key}': {value:?}")]
    InvalidValue { key: &'static str, value: String },
    #[error("'{0}' must be at least 1")]
    MustBePositive(&'static str),
}

/// Alternating key/value argument list.
pub struct ArgMap {
    values: HashMap<String, String>,
}

impl ArgMap {
    pub fn parse(args: &[String]) -> Self {
        if args.len() % 2 != 0 {
            warn!(
                "ignoring trailing key without a value: {:?}",
                args[args.len() - 1]
            );
        }

        let values = args
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();

        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key)
            .map(str::to_string)
            .ok_or(ConfigError::MissingKey(key))
    }

    /// Parse the value under `key`, or fall back to `default` when absent.
    pub fn get_or<T: FromStr>(&self, key: &'static str, default: T) -> Result<T, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
                key,
                value: raw.to_string(),
            }),
        }
    }
}

fn positive(key: &'static str, value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        Err(ConfigError::MustBePositive(key))
    } else {
        Ok(value)
    }
}

/// Configuration for the binary RPC benchmark client.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Target address, `host:port`. Required.
    pub address: String,
    pub channels: usize,
    pub outstanding_rpcs: usize,
    pub warmup: Duration,
    pub duration: Duration,
}

impl RpcConfig {
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let map = ArgMap::parse(args);

        Ok(Self {
            address: map.require("address")?,
            channels: positive("channels", map.get_or("channels", DEFAULT_CHANNELS)?)?,
            outstanding_rpcs: positive(
                "outstanding_rpcs",
                map.get_or("outstanding_rpcs", DEFAULT_OUTSTANDING)?,
            )?,
            warmup: Duration::from_secs(map.get_or("warmup_duration", DEFAULT_WARMUP_SECS)?),
            duration: Duration::from_secs(map.get_or("duration", DEFAULT_DURATION_SECS)?),
        })
    }
}

/// Configuration for the HTTP benchmark client.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL of the target service.
    pub address: String,
    pub channels: usize,
    pub outstanding_calls: usize,
    /// Run thread-per-worker blocking pipelines instead of async ones.
    pub blocking: bool,
    /// Connection pool size per channel.
    pub connections: usize,
    pub warmup: Duration,
    pub duration: Duration,
}

impl HttpConfig {
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let map = ArgMap::parse(args);

        Ok(Self {
            address: map
                .get("address")
                .unwrap_or(DEFAULT_HTTP_ADDRESS)
                .to_string(),
            channels: positive("channels", map.get_or("channels", DEFAULT_CHANNELS)?)?,
            outstanding_calls: positive(
                "outstanding_calls",
                map.get_or("outstanding_calls", DEFAULT_OUTSTANDING)?,
            )?,
            blocking: map.get_or("blocking", false)?,
            connections: positive(
                "connections",
                map.get_or("connections", DEFAULT_HTTP_CONNECTIONS)?,
            )?,
            warmup: Duration::from_secs(map.get_or("warmup_duration", DEFAULT_WARMUP_SECS)?),
            duration: Duration::from_secs(map.get_or("duration", DEFAULT_DURATION_SECS)?),
        })
    }
}
