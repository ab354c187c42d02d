//! Evaluators with known outcomes for composition tests.

use crate::decision::Decision;
use crate::evaluator::{EvaluatorKind, PolicyEvaluator};
use crate::evaluators::{BooleanAttributeEvaluator, OttlConditionEvaluator, SpanCountEvaluator};
use crate::ottl::{ConditionContext, ConditionError, ConditionEvaluator, UnavailableConditions};
use otail_policy::{BooleanAttributeConfig, ErrorMode, OttlConditionConfig, SpanCountConfig};
use otail_trace::{Span, Trace};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A two-span trace; every span carries `retry = true`.
pub fn trace() -> Trace {
    Trace::from_spans(
        "0af7651916cd43dd8448eb211c80319c",
        vec![
            Span::new("a", "GET /").with_attribute("retry", true),
            Span::new("b", "SELECT").with_attribute("retry", true),
        ],
    )
}

/// An evaluator deciding `decision` on [`trace`].
pub fn deciding(name: &str, decision: Decision) -> PolicyEvaluator {
    let kind = match decision {
        Decision::Sampled => EvaluatorKind::AlwaysSample,
        Decision::NotSampled => EvaluatorKind::SpanCount(SpanCountEvaluator::new(&SpanCountConfig {
            min_spans: 1_000,
            max_spans: 0,
        })),
        Decision::InvertNotSampled | Decision::InvertSampled => {
            EvaluatorKind::BooleanAttribute(BooleanAttributeEvaluator::new(&BooleanAttributeConfig {
                key: if decision == Decision::InvertNotSampled {
                    "retry".to_string()
                } else {
                    "missing".to_string()
                },
                value: true,
                invert_match: true,
            }))
        }
        Decision::Error => EvaluatorKind::OttlCondition(OttlConditionEvaluator::new(
            name,
            &OttlConditionConfig {
                error_mode: ErrorMode::Propagate,
                span_conditions: vec!["true".to_string()],
                span_event_conditions: Vec::new(),
            },
            Arc::new(UnavailableConditions),
        )),
    };
    PolicyEvaluator::new(name, kind)
}

/// Counts evaluations and answers with a fixed result.
#[derive(Debug, Default)]
pub struct Spy {
    calls: AtomicUsize,
    matches: bool,
}

impl Spy {
    pub fn matching(matches: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            matches,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// A policy that asks this spy once per span.
    pub fn evaluator(self: &Arc<Self>, name: &str) -> PolicyEvaluator {
        let conditions: Arc<dyn ConditionEvaluator> = self.clone();
        PolicyEvaluator::new(
            name,
            EvaluatorKind::OttlCondition(OttlConditionEvaluator::new(
                name,
                &OttlConditionConfig {
                    error_mode: ErrorMode::Propagate,
                    span_conditions: vec!["spy".to_string()],
                    span_event_conditions: Vec::new(),
                },
                conditions,
            )),
        )
    }
}

impl ConditionEvaluator for Spy {
    fn evaluate_conditions(
        &self,
        _conditions: &[String],
        _context: &ConditionContext<'_>,
    ) -> Result<bool, ConditionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.matches)
    }
}

#[test]
fn deciding_produces_each_decision() {
    for decision in Decision::ALL {
        assert_eq!(deciding("d", decision).evaluate(&trace(), 0), decision);
    }
}
