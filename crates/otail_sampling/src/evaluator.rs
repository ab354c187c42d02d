//! Compiled policies.

use crate::decision::Decision;
use crate::evaluators::{
    AndEvaluator, BooleanAttributeEvaluator, CompositeEvaluator, DropEvaluator, LatencyEvaluator,
    NumericAttributeEvaluator, OttlConditionEvaluator, ProbabilisticEvaluator,
    RateLimitingEvaluator, SpanCountEvaluator, StatusCodeEvaluator, StringAttributeEvaluator,
    TraceStateEvaluator,
};
use otail_trace::Trace;

/// A named, executable policy.
///
/// Built by [`crate::Builder`]. Only the rate-limiting and composite kinds keep
/// state between calls, so `evaluate` takes `&mut self` and the caller's clock.
#[derive(Debug)]
pub struct PolicyEvaluator {
    name: String,
    kind: EvaluatorKind,
}

/// The evaluator behind a [`PolicyEvaluator`], one per policy type.
#[derive(Debug)]
pub enum EvaluatorKind {
    /// Samples everything.
    AlwaysSample,
    /// Hash-based sampling.
    Probabilistic(ProbabilisticEvaluator),
    /// Span rate cap.
    RateLimiting(RateLimitingEvaluator),
    /// Span status codes.
    StatusCode(StatusCodeEvaluator),
    /// String attribute match.
    StringAttribute(StringAttributeEvaluator),
    /// Numeric attribute range.
    NumericAttribute(NumericAttributeEvaluator),
    /// Boolean attribute match.
    BooleanAttribute(BooleanAttributeEvaluator),
    /// Trace duration.
    Latency(LatencyEvaluator),
    /// Span count range.
    SpanCount(SpanCountEvaluator),
    /// W3C trace state entries.
    TraceState(TraceStateEvaluator),
    /// External OTTL conditions.
    OttlCondition(OttlConditionEvaluator),
    /// Unanimous children.
    And(AndEvaluator),
    /// Veto when every child samples.
    Drop(DropEvaluator),
    /// First match under a shared budget.
    Composite(CompositeEvaluator),
}

impl PolicyEvaluator {
    /// Wraps an evaluator under a policy name.
    pub fn new(name: impl Into<String>, kind: EvaluatorKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The policy name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying evaluator.
    pub const fn kind(&self) -> &EvaluatorKind {
        &self.kind
    }

    /// Evaluates one trace at `now_ns`.
    ///
    /// `now_ns` only matters to rate-limited policies.
    pub fn evaluate(&mut self, trace: &Trace, now_ns: u64) -> Decision {
        match &mut self.kind {
            EvaluatorKind::AlwaysSample => Decision::Sampled,
            EvaluatorKind::Probabilistic(eval) => eval.evaluate(trace),
            EvaluatorKind::RateLimiting(eval) => eval.evaluate(trace, now_ns),
            EvaluatorKind::StatusCode(eval) => eval.evaluate(trace),
            EvaluatorKind::StringAttribute(eval) => eval.evaluate(trace),
            EvaluatorKind::NumericAttribute(eval) => eval.evaluate(trace),
            EvaluatorKind::BooleanAttribute(eval) => eval.evaluate(trace),
            EvaluatorKind::Latency(eval) => eval.evaluate(trace),
            EvaluatorKind::SpanCount(eval) => eval.evaluate(trace),
            EvaluatorKind::TraceState(eval) => eval.evaluate(trace),
            EvaluatorKind::OttlCondition(eval) => eval.evaluate(trace),
            EvaluatorKind::And(eval) => eval.evaluate(trace, now_ns),
            EvaluatorKind::Drop(eval) => eval.evaluate(trace, now_ns),
            EvaluatorKind::Composite(eval) => eval.evaluate(trace, now_ns),
        }
    }
}
