//! Drop groups.

use crate::decision::Decision;
use crate::evaluator::PolicyEvaluator;
use otail_trace::Trace;

/// Vetoes traces that every child samples.
///
/// When all children return [`Decision::Sampled`] the result is
/// [`Decision::InvertNotSampled`], which drops the trace regardless of other
/// policies. Otherwise the group stays out of the way with
/// [`Decision::NotSampled`].
#[derive(Debug)]
pub struct DropEvaluator {
    children: Vec<PolicyEvaluator>,
}

impl DropEvaluator {
    /// Creates the evaluator over already-built children.
    pub fn new(children: Vec<PolicyEvaluator>) -> Self {
        Self { children }
    }

    /// The child evaluators, in evaluation order.
    pub fn children(&self) -> &[PolicyEvaluator] {
        &self.children
    }

    /// Evaluates the trace.
    pub fn evaluate(&mut self, trace: &Trace, now_ns: u64) -> Decision {
        for child in &mut self.children {
            match child.evaluate(trace, now_ns) {
                Decision::Sampled => {}
                Decision::Error => return Decision::Error,
                _ => return Decision::NotSampled,
            }
        }
        Decision::InvertNotSampled
    }
}
