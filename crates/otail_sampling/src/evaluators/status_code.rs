//! Span status matching.

use crate::decision::Decision;
use crate::predicate::has_span_with_condition;
use otail_policy::StatusCodeConfig;
use otail_trace::{StatusCode, Trace};

/// Samples traces with a span whose status code is in the configured set.
#[derive(Debug, Clone)]
pub struct StatusCodeEvaluator {
    codes: Vec<StatusCode>,
}

impl StatusCodeEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub fn new(config: &StatusCodeConfig) -> Self {
        Self {
            codes: config.status_codes.clone(),
        }
    }

    /// Evaluates the trace.
    pub fn evaluate(&self, trace: &Trace) -> Decision {
        has_span_with_condition(trace, |span| self.codes.contains(&span.status.code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otail_trace::{Span, SpanStatus};

    #[test]
    fn matches_any_configured_code() {
        let eval = StatusCodeEvaluator::new(&StatusCodeConfig {
            status_codes: vec![StatusCode::Error, StatusCode::Unset],
        });

        let failing = Trace::from_spans(
            "t",
            vec![
                Span::new("a", "ok").with_status(SpanStatus::ok()),
                Span::new("b", "boom").with_status(SpanStatus::error("boom")),
            ],
        );
        let healthy =
            Trace::from_spans("t", vec![Span::new("a", "ok").with_status(SpanStatus::ok())]);
        let unset = Trace::from_spans("t", vec![Span::new("a", "plain")]);

        assert_eq!(eval.evaluate(&failing), Decision::Sampled);
        assert_eq!(eval.evaluate(&healthy), Decision::NotSampled);
        assert_eq!(eval.evaluate(&unset), Decision::Sampled);
        assert_eq!(eval.evaluate(&Trace::new("empty")), Decision::NotSampled);
    }
}
