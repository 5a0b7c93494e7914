use hdrhistogram::Histogram;

/// The histogram can record values between 1 microsecond and 1 minute.
pub const MAX_LATENCY_MICROS: u64 = 60_000_000;

/// Value quantization will be no more than 1% (two significant decimal digits).
pub const SIGNIFICANT_DIGITS: u8 = 2;

/// Per-worker latency recorder backed by a compressed histogram.
///
/// Every `LatencyHistogram` is constructed with the same fixed range
/// ([`MAX_LATENCY_MICROS`], [`SIGNIFICANT_DIGITS`]), which makes any two of
/// them merge-compatible by construction.
///
/// Recording policy: values are clamped into the recordable range. A
/// sub-microsecond latency (possible when the clock resolution is coarser
/// than one request round trip) counts as 1 microsecond; anything beyond the
/// 60 second ceiling counts as 60 seconds.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    inner: Histogram<u64>,
}

impl LatencyHistogram {
    pub fn new() -> Self {
        Self {
            inner: Histogram::new_with_bounds(1, MAX_LATENCY_MICROS, SIGNIFICANT_DIGITS)
                .expect("histogram bounds are statically valid"),
        }
    }

    /// Record one occurrence of a latency in microseconds, clamped to the
    /// recordable range.
    pub fn record(&mut self, micros: u64) {
        let _ = self.inner.record(micros.clamp(1, MAX_LATENCY_MICROS));
    }

    /// Record a latency measured in nanoseconds.
    ///
    /// The value is converted with integer division by 1000; a delta below
    /// one microsecond is then clamped up to the 1 microsecond floor rather
    /// than recorded as zero.
    pub fn record_nanos(&mut self, nanos: u64) {
        self.record(nanos / 1_000);
    }

    /// Fold another histogram's counts into this one.
    ///
    /// Bucket counts are summed, so merging is commutative and associative
    /// and the total count afterwards is the sum of both inputs.
    pub fn merge(&mut self, other: &LatencyHistogram) {
        self.inner
            .add(&other.inner)
            .expect("histogram bounds are identical by construction");
    }

    /// The smallest recorded value such that the fraction of occurrences at
    /// or below it is at least `p`/100, for `p` in [0, 100].
    ///
    /// Returns 0 when nothing has been recorded.
    pub fn percentile(&self, p: f64) -> u64 {
        self.inner.value_at_quantile(p / 100.0)
    }

    /// Highest recorded value (quantized), or 0 when empty.
    pub fn max(&self) -> u64 {
        self.inner.max()
    }

    /// Sum of all bucket counts.
    pub fn total_count(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}
