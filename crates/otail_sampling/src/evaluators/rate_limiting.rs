//! Per-second span cap.

use crate::bucket::TokenBucket;
use crate::decision::Decision;
use crate::predicate::get_span_count;
use otail_policy::RateLimitingConfig;
use otail_trace::Trace;

/// Admits traces while the span budget lasts.
///
/// Each evaluation charges the trace's span count against a bucket refilled at
/// `spans_per_second`. The bucket is private to this evaluator.
#[derive(Debug, Clone)]
pub struct RateLimitingEvaluator {
    bucket: TokenBucket,
}

impl RateLimitingEvaluator {
    /// Creates the evaluator with a full bucket.
    #[must_use]
    pub fn new(config: &RateLimitingConfig) -> Self {
        Self {
            bucket: TokenBucket::new(config.spans_per_second),
        }
    }

    /// Evaluates the trace at `now_ns`.
    pub fn evaluate(&mut self, trace: &Trace, now_ns: u64) -> Decision {
        let spans = u64::try_from(get_span_count(trace)).unwrap_or(u64::MAX);
        Decision::from_match(self.bucket.try_consume(spans, now_ns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otail_trace::Span;

    const SECOND: u64 = 1_000_000_000;

    fn trace(spans: usize) -> Trace {
        Trace::from_spans(
            "t",
            (0..spans).map(|i| Span::new(i.to_string(), "op")).collect(),
        )
    }

    #[test]
    fn consumes_span_count() {
        let mut eval = RateLimitingEvaluator::new(&RateLimitingConfig {
            spans_per_second: 5,
        });

        assert_eq!(eval.evaluate(&trace(3), 0), Decision::Sampled);
        assert_eq!(eval.evaluate(&trace(3), 0), Decision::NotSampled);
        assert_eq!(eval.evaluate(&trace(2), 0), Decision::Sampled);
        assert_eq!(eval.evaluate(&trace(1), 0), Decision::NotSampled);
    }

    #[test]
    fn refills_over_time() {
        let mut eval = RateLimitingEvaluator::new(&RateLimitingConfig {
            spans_per_second: 4,
        });

        assert_eq!(eval.evaluate(&trace(4), 0), Decision::Sampled);
        assert_eq!(eval.evaluate(&trace(2), SECOND / 4), Decision::NotSampled);
        assert_eq!(eval.evaluate(&trace(2), SECOND / 2), Decision::Sampled);
    }

    #[test]
    fn oversized_traces_never_fit() {
        let mut eval = RateLimitingEvaluator::new(&RateLimitingConfig {
            spans_per_second: 2,
        });

        assert_eq!(eval.evaluate(&trace(3), 10 * SECOND), Decision::NotSampled);
    }

    #[test]
    fn empty_trace_costs_nothing() {
        let mut eval = RateLimitingEvaluator::new(&RateLimitingConfig {
            spans_per_second: 0,
        });

        assert_eq!(eval.evaluate(&trace(0), 0), Decision::Sampled);
        assert_eq!(eval.evaluate(&trace(1), 0), Decision::NotSampled);
    }
}
