//! Fixed-format benchmark report.
//!
//! The report is a pure function of the merged histogram, the measured wall
//! time and the configuration echoes; callers print the rendered text.

use crate::config::{HttpConfig, RpcConfig};
use crate::driver::BenchOutcome;
use std::fmt;

/// Column at which values start; labels are left-justified into this width.
const LABEL_WIDTH: usize = 32;

/// An ordered list of `label: value` lines with fixed-width labels.
#[derive(Debug)]
pub struct Report {
    lines: Vec<(&'static str, String)>,
}

impl Report {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn push(&mut self, label: &'static str, value: impl fmt::Display) {
        self.lines.push((label, value.to_string()));
    }

    /// The six latency lines and the QPS line, shared by both transports.
    fn push_latency_stats(&mut self, outcome: &BenchOutcome) {
        let histogram = &outcome.histogram;
        self.push("50%ile Latency (in micros):", histogram.percentile(50.0));
        self.push("90%ile Latency (in micros):", histogram.percentile(90.0));
        self.push("95%ile Latency (in micros):", histogram.percentile(95.0));
        self.push("99%ile Latency (in micros):", histogram.percentile(99.0));
        self.push("99.9%ile Latency (in micros):", histogram.percentile(99.9));
        self.push("Maximum Latency (in micros):", histogram.percentile(100.0));
        self.push("QPS:", queries_per_second(outcome));
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for (label, value) in &self.lines {
            out.push_str(&format!("{:<width$}{}\n", label, value, width = LABEL_WIDTH));
        }
        out
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Completed requests per second, integer division over nanoseconds.
fn queries_per_second(outcome: &BenchOutcome) -> u64 {
    let nanos = (outcome.elapsed.as_nanos() as u64).max(1);
    (outcome.histogram.total_count() as u128 * 1_000_000_000 / nanos as u128) as u64
}

pub fn rpc_report(config: &RpcConfig, outcome: &BenchOutcome) -> Report {
    let mut report = Report::new();
    report.push("Channels:", config.channels);
    report.push("Outstanding Rpcs per Channel:", config.outstanding_rpcs);
    report.push_latency_stats(outcome);
    report
}

pub fn http_report(config: &HttpConfig, outcome: &BenchOutcome) -> Report {
    let mut report = Report::new();
    report.push("Channels:", config.channels);
    report.push("Outstanding Calls per Channel:", config.outstanding_calls);
    report.push("Blocking:", config.blocking);
    report.push("Connections:", config.connections);
    report.push_latency_stats(outcome);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latency::LatencyHistogram;
    use std::time::Duration;

    fn outcome_with_single_value() -> BenchOutcome {
        let mut histogram = LatencyHistogram::new();
        histogram.record(1);
        BenchOutcome {
            histogram,
            elapsed: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_rpc_report_literal_format() {
        let config = RpcConfig {
            address: "localhost:8980".to_string(),
            channels: 1,
            outstanding_rpcs: 1,
            warmup: Duration::ZERO,
            duration: Duration::from_secs(1),
        };

        let rendered = rpc_report(&config, &outcome_with_single_value()).render();

        let expected = "\
Channels:                       1\n\
Outstanding Rpcs per Channel:   1\n\
50%ile Latency (in micros):     1\n\
90%ile Latency (in micros):     1\n\
95%ile Latency (in micros):     1\n\
99%ile Latency (in micros):     1\n\
99.9%ile Latency (in micros):   1\n\
Maximum Latency (in micros):    1\n\
QPS:                            1\n";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_http_report_echoes_transport_knobs() {
        let config = HttpConfig {
            address: "http://localhost:8080".to_string(),
            channels: 4,
            outstanding_calls: 10,
            blocking: false,
            connections: 10,
            warmup: Duration::ZERO,
            duration: Duration::from_secs(1),
        };

        let rendered = http_report(&config, &outcome_with_single_value()).render();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[0], "Channels:                       4");
        assert_eq!(lines[1], "Outstanding Calls per Channel:  10");
        assert_eq!(lines[2], "Blocking:                       false");
        assert_eq!(lines[3], "Connections:                    10");
        assert!(lines[4].starts_with("50%ile Latency (in micros):"));
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn test_qps_integer_division() {
        let mut histogram = LatencyHistogram::new();
        for _ in 0..1_500 {
            histogram.record(1_000);
        }
        let outcome = BenchOutcome {
            histogram,
            elapsed: Duration::from_secs(2),
        };
        assert_eq!(queries_per_second(&outcome), 750);

        // Truncating division, matching the integer report format
        let outcome = BenchOutcome {
            histogram: outcome.histogram,
            elapsed: Duration::from_millis(1_999),
        };
        assert_eq!(queries_per_second(&outcome), 750_375);
    }
}
