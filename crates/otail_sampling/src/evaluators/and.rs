//! Unanimous child policies.

use crate::decision::Decision;
use crate::evaluator::PolicyEvaluator;
use otail_trace::Trace;

/// Samples only when every child samples.
///
/// Children run in declaration order and evaluation stops at the first child
/// that does not return [`Decision::Sampled`]. An inverted pass
/// ([`Decision::InvertSampled`]) does not count as a sample here.
#[derive(Debug)]
pub struct AndEvaluator {
    children: Vec<PolicyEvaluator>,
}

impl AndEvaluator {
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
                Decision::NotSampled | Decision::InvertNotSampled | Decision::InvertSampled => {
                    return Decision::NotSampled
                }
            }
        }
        Decision::Sampled
    }
}
