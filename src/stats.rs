use std::time::Duration;

use hdrhistogram::Histogram;

/// Operational counters plus a page-read latency histogram (1us to 100s,
/// 3 significant figures). Owned by the collector; the poll path is a single
/// task, so no locking.
pub struct PollStats {
    reads: Histogram<u64>,
    pub ticks: u64,
    pub misses: u64,
    pub rounds: u64,
}

impl PollStats {
    pub fn new() -> Self {
        let reads =
            Histogram::new_with_bounds(1, 100_000_000, 3).expect("valid histogram bounds");
        Self {
            reads,
            ticks: 0,
            misses: 0,
            rounds: 0,
        }
    }

    /// Record how long one page read took.
    pub fn record_read(&mut self, elapsed: Duration) {
        let us = elapsed.as_micros().min(u128::from(u64::MAX)) as u64;
        let _ = self.reads.record(us.max(1));
    }

    /// (p50_us, p95_us, p99_us) of page-read latency, None before the first
    /// sample.
    pub fn read_percentiles(&self) -> Option<(u64, u64, u64)> {
        if self.reads.len() == 0 {
            return None;
        }
        Some((
            self.reads.value_at_quantile(0.5),
            self.reads.value_at_quantile(0.95),
            self.reads.value_at_quantile(0.99),
        ))
    }
}

impl Default for PollStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentiles_need_at_least_one_sample() {
        let stats = PollStats::new();
        assert!(stats.read_percentiles().is_none());
    }

    #[test]
    fn sub_microsecond_reads_still_register() {
        let mut stats = PollStats::new();
        stats.record_read(Duration::from_nanos(10));
        let (p50, _, _) = stats.read_percentiles().unwrap();
        assert!(p50 >= 1);
    }
}
