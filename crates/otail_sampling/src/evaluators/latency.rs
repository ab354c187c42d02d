//! Trace duration bounds.

use crate::decision::Decision;
use otail_policy::LatencyConfig;
use otail_trace::Trace;
use tracing::warn;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// Samples traces whose duration reaches the threshold.
///
/// Duration is the span from the earliest start to the latest end seen so far
/// while walking the spans, so a trace samples as soon as the running window is
/// long enough. An upper bound of zero is treated as unset.
#[derive(Debug, Clone)]
pub struct LatencyEvaluator {
    threshold_ns: u64,
    upper_threshold_ns: Option<u64>,
}

impl LatencyEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub fn new(config: &LatencyConfig) -> Self {
        Self {
            threshold_ns: config.threshold_ms.saturating_mul(NANOS_PER_MILLI),
            upper_threshold_ns: config
                .upper_threshold_ms
                .filter(|&ms| ms > 0)
                .map(|ms| ms.saturating_mul(NANOS_PER_MILLI)),
        }
    }

    /// Evaluates the trace.
    ///
    /// Returns [`Decision::Error`] if a visited span has a non-numeric timestamp.
    pub fn evaluate(&self, trace: &Trace) -> Decision {
        let mut min_start = u64::MAX;
        let mut max_end = 0;

        for span in trace.spans() {
            let (Some(start), Some(end)) = (span.start_ns(), span.end_ns()) else {
                warn!(
                    "Span '{}' in trace '{}' has a non-numeric timestamp",
                    span.span_id, trace.trace_id
                );
                return Decision::Error;
            };

            min_start = min_start.min(start);
            max_end = max_end.max(end);

            let duration = max_end.saturating_sub(min_start);
            if self.within_bounds(duration) {
                return Decision::Sampled;
            }
        }

        Decision::NotSampled
    }

    fn within_bounds(&self, duration_ns: u64) -> bool {
        duration_ns >= self.threshold_ns
            && !matches!(self.upper_threshold_ns, Some(upper) if duration_ns > upper)
    }
}
