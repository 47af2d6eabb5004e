//! Execution telemetry for [`crate::query::QueryEngine`].
//!
//! Every engine call records one [`QueryRecord`]; [`QueryStats`] keeps the
//! running totals a caller (or an external benchmarking harness) reads back
//! after a batch of queries.

use std::time::Duration;

/// Telemetry for a single engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    pub engine: &'static str,
    pub elapsed: Duration,
    pub outer_iterations: usize,
    pub result_size: usize,
}

/// Running totals across every call an engine instance has served.
#[derive(Debug, Clone, Default)]
pub struct QueryStats {
    pub queries_run: usize,
    pub total_elapsed: Duration,
    pub total_outer_iterations: usize,
    pub peak_result_size: usize,
    last: Option<QueryRecord>,
}

impl QueryStats {
    #[must_use]
    pub fn new() -> Self {
        QueryStats::default()
    }

    pub fn record(&mut self, record: QueryRecord) {
        self.queries_run += 1;
        self.total_elapsed += record.elapsed;
        self.total_outer_iterations += record.outer_iterations;
        self.peak_result_size = self.peak_result_size.max(record.result_size);
        self.last = Some(record);
    }

    #[must_use]
    pub fn last(&self) -> Option<&QueryRecord> {
        self.last.as_ref()
    }

    #[must_use]
    pub fn mean_elapsed(&self) -> Duration {
        if self.queries_run == 0 {
            Duration::ZERO
        } else {
            self.total_elapsed / self.queries_run as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_elapsed_is_zero_with_no_queries() {
        let stats = QueryStats::new();
        assert_eq!(stats.mean_elapsed(), Duration::ZERO);
    }

    #[test]
    fn record_tracks_peak_result_size() {
        let mut stats = QueryStats::new();
        stats.record(QueryRecord {
            engine: "tensor_rpq",
            elapsed: Duration::from_millis(1),
            outer_iterations: 3,
            result_size: 5,
        });
        stats.record(QueryRecord {
            engine: "bfs_rpq",
            elapsed: Duration::from_millis(2),
            outer_iterations: 1,
            result_size: 2,
        });
        assert_eq!(stats.queries_run, 2);
        assert_eq!(stats.peak_result_size, 5);
        assert_eq!(stats.total_outer_iterations, 4);
    }
}
