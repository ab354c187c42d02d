//! Runs top-level policies and combines their decisions.
//!
//! Every policy is evaluated; there is no short-circuit at this level. The
//! per-policy decisions reduce to one final decision by priority:
//!
//! 1. any [`Decision::Error`] gives `Error`;
//! 2. otherwise any [`Decision::InvertNotSampled`] vetoes with `NotSampled`;
//! 3. otherwise any [`Decision::Sampled`] gives `Sampled`;
//! 4. otherwise `NotSampled`.
//!
//! [`Decision::InvertSampled`] alone never samples a trace.

use crate::builder::Builder;
use crate::decision::Decision;
use crate::error::Result;
use crate::evaluator::PolicyEvaluator;
use otail_policy::Policy;
use otail_trace::Trace;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Outcome of one trace against a policy set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResult {
    /// The combined decision.
    pub final_decision: Decision,
    /// Decision of each top-level policy, by name.
    pub policy_decisions: BTreeMap<String, Decision>,
}

/// Reduces per-policy decisions to a final decision.
pub fn reduce(decisions: impl IntoIterator<Item = Decision>) -> Decision {
    let (mut vetoed, mut sampled) = (false, false);
    for decision in decisions {
        match decision {
            Decision::Error => return Decision::Error,
            Decision::InvertNotSampled => vetoed = true,
            Decision::Sampled => sampled = true,
            Decision::NotSampled | Decision::InvertSampled => {}
        }
    }
    if vetoed {
        Decision::NotSampled
    } else {
        Decision::from_match(sampled)
    }
}

/// Evaluates every policy against `trace` and combines the results.
pub fn make_decision(
    trace: &Trace,
    evaluators: &mut [PolicyEvaluator],
    now_ns: u64,
) -> DecisionResult {
    let policy_decisions: BTreeMap<String, Decision> = evaluators
        .iter_mut()
        .map(|evaluator| {
            let decision = evaluator.evaluate(trace, now_ns);
            if decision == Decision::Error {
                warn!(
                    "Policy '{}' failed on trace '{}'",
                    evaluator.name(),
                    trace.trace_id
                );
            }
            (evaluator.name().to_string(), decision)
        })
        .collect();

    let final_decision = reduce(policy_decisions.values().copied());
    debug!("Trace '{}' decided {}", trace.trace_id, final_decision);

    DecisionResult {
        final_decision,
        policy_decisions,
    }
}

/// A compiled policy set.
///
/// Rate-limited policies keep their budgets between calls, so one `Sampler`
/// should see traces in time order.
#[derive(Debug)]
pub struct Sampler {
    evaluators: Vec<PolicyEvaluator>,
}

impl Sampler {
    /// Wraps already-built evaluators.
    pub fn new(evaluators: Vec<PolicyEvaluator>) -> Self {
        Self { evaluators }
    }

    /// Builds a sampler with a default [`Builder`].
    ///
    /// # Errors
    ///
    /// Returns an error if any policy fails to build.
    pub fn from_policies(policies: &[Policy]) -> Result<Self> {
        Self::with_builder(&Builder::new(), policies)
    }

    /// Builds a sampler with `builder`.
    ///
    /// # Errors
    ///
    /// Returns an error if any policy fails to build.
    pub fn with_builder(builder: &Builder, policies: &[Policy]) -> Result<Self> {
        builder.build_all(policies).map(Self::new)
    }

    /// Decides one trace at `now_ns`.
    pub fn make_decision(&mut self, trace: &Trace, now_ns: u64) -> DecisionResult {
        make_decision(trace, &mut self.evaluators, now_ns)
    }

    /// Top-level policy names in evaluation order.
    pub fn policy_names(&self) -> impl Iterator<Item = &str> {
        self.evaluators.iter().map(PolicyEvaluator::name)
    }

    /// Number of top-level policies.
    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    /// Returns true if there are no policies.
    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }
}
