//! W3C trace-state matching.

use crate::decision::Decision;
use crate::predicate::has_span_with_condition;
use otail_policy::TraceStateConfig;
use otail_trace::Trace;
use std::collections::HashSet;

const MAX_ENTRY_LEN: usize = 256;

/// Samples traces with a span whose trace state carries `key` set to one of the values.
#[derive(Debug, Clone)]
pub struct TraceStateEvaluator {
    key: String,
    values: HashSet<String>,
}

impl TraceStateEvaluator {
    /// Creates the evaluator.
    ///
    /// Empty values, and values whose entry would reach 256 bytes, can never
    /// appear in a valid trace state and are dropped.
    #[must_use]
    pub fn new(config: &TraceStateConfig) -> Self {
        let values = config
            .values
            .iter()
            .filter(|v| !v.is_empty() && config.key.len() + v.len() < MAX_ENTRY_LEN)
            .cloned()
            .collect();
        Self {
            key: config.key.clone(),
            values,
        }
    }

    /// Evaluates the trace.
    pub fn evaluate(&self, trace: &Trace) -> Decision {
        has_span_with_condition(trace, |span| {
            span.trace_state
                .as_deref()
                .and_then(|state| lookup(state, &self.key))
                .is_some_and(|value| self.values.contains(value))
        })
    }
}

/// Returns the value of the first `key=value` entry with a matching key.
fn lookup<'a>(trace_state: &'a str, key: &str) -> Option<&'a str> {
    trace_state
        .split(',')
        .filter_map(|entry| entry.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use otail_trace::Span;

    fn eval(values: &[&str]) -> TraceStateEvaluator {
        TraceStateEvaluator::new(&TraceStateConfig {
            key: "vendor".to_string(),
            values: values.iter().map(ToString::to_string).collect(),
        })
    }

    fn with_state(state: &str) -> Trace {
        Trace::from_spans("t", vec![Span::new("a", "op").with_trace_state(state)])
    }

    #[test]
    fn lookup_entries() {
        assert_eq!(lookup("a=1, vendor=p2 ,c=3", "vendor"), Some("p2"));
        assert_eq!(lookup("a=1,novalue,vendor=x", "vendor"), Some("x"));
        assert_eq!(lookup("a=1", "vendor"), None);
        assert_eq!(lookup("", "vendor"), None);
    }

    #[test]
    fn matches_configured_values() {
        let eval = eval(&["p1", "p2"]);

        assert_eq!(eval.evaluate(&with_state("rojo=00f067,vendor=p2")), Decision::Sampled);
        assert_eq!(eval.evaluate(&with_state("vendor=p3")), Decision::NotSampled);
        assert_eq!(eval.evaluate(&with_state("other=p1")), Decision::NotSampled);
        assert_eq!(
            eval.evaluate(&Trace::from_spans("t", vec![Span::new("a", "op")])),
            Decision::NotSampled
        );
    }

    #[test]
    fn drops_values_that_cannot_appear() {
        let long = "x".repeat(250);
        let eval = eval(&["", &long, "ok"]);

        assert_eq!(eval.values.len(), 1);
        assert!(eval.values.contains("ok"));
    }
}
