//! Span count bounds.

use crate::decision::Decision;
use crate::predicate::get_span_count;
use otail_policy::SpanCountConfig;
use otail_trace::Trace;

/// Samples traces whose span count lies within bounds.
///
/// A `max_spans` of zero leaves the upper bound open.
#[derive(Debug, Clone)]
pub struct SpanCountEvaluator {
    min_spans: u64,
    max_spans: u64,
}

impl SpanCountEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub const fn new(config: &SpanCountConfig) -> Self {
        Self {
            min_spans: config.min_spans,
            max_spans: config.max_spans,
        }
    }

    /// Evaluates the trace.
    pub fn evaluate(&self, trace: &Trace) -> Decision {
        let count = u64::try_from(get_span_count(trace)).unwrap_or(u64::MAX);
        let matched = if self.max_spans == 0 {
            count >= self.min_spans
        } else {
            (self.min_spans..=self.max_spans).contains(&count)
        };
        Decision::from_match(matched)
    }
}
