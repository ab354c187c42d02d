//! Compiles policy configuration into evaluators.

use crate::error::{Error, Result};
use crate::evaluator::{EvaluatorKind, PolicyEvaluator};
use crate::evaluators::{
    AndEvaluator, BooleanAttributeEvaluator, CompositeEvaluator, DropEvaluator, LatencyEvaluator,
    NumericAttributeEvaluator, OttlConditionEvaluator, ProbabilisticEvaluator,
    RateLimitingEvaluator, SpanCountEvaluator, StatusCodeEvaluator, StringAttributeEvaluator,
    TraceStateEvaluator,
};
use crate::ottl::ConditionEvaluator;
use otail_policy::{Policy, PolicyKind};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds [`PolicyEvaluator`]s from [`Policy`] values.
///
/// All validation happens here: a successfully built evaluator never fails on
/// configuration grounds while evaluating.
#[derive(Clone, Default)]
pub struct Builder {
    conditions: Option<Arc<dyn ConditionEvaluator>>,
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("conditions", &self.conditions.is_some())
            .finish()
    }
}

impl Builder {
    /// Creates a builder without an OTTL condition evaluator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the evaluator used by `ottl_condition` policies.
    #[must_use]
    pub fn with_condition_evaluator(mut self, conditions: Arc<dyn ConditionEvaluator>) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Builds one policy, recursing into sub-policies in declaration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the policy or any sub-policy is invalid.
    pub fn build(&self, policy: &Policy) -> Result<PolicyEvaluator> {
        let name = policy.name.as_str();
        let kind = match &policy.kind {
            PolicyKind::AlwaysSample => EvaluatorKind::AlwaysSample,
            PolicyKind::Probabilistic(config) => {
                EvaluatorKind::Probabilistic(ProbabilisticEvaluator::new(name, config)?)
            }
            PolicyKind::RateLimiting(config) => {
                EvaluatorKind::RateLimiting(RateLimitingEvaluator::new(config))
            }
            PolicyKind::StatusCode(config) => {
                EvaluatorKind::StatusCode(StatusCodeEvaluator::new(config))
            }
            PolicyKind::StringAttribute(config) => {
                EvaluatorKind::StringAttribute(StringAttributeEvaluator::new(name, config)?)
            }
            PolicyKind::NumericAttribute(config) => {
                EvaluatorKind::NumericAttribute(NumericAttributeEvaluator::new(name, config)?)
            }
            PolicyKind::BooleanAttribute(config) => {
                EvaluatorKind::BooleanAttribute(BooleanAttributeEvaluator::new(config))
            }
            PolicyKind::Latency(config) => EvaluatorKind::Latency(LatencyEvaluator::new(config)),
            PolicyKind::SpanCount(config) => {
                EvaluatorKind::SpanCount(SpanCountEvaluator::new(config))
            }
            PolicyKind::TraceState(config) => {
                EvaluatorKind::TraceState(TraceStateEvaluator::new(config))
            }
            PolicyKind::OttlCondition(config) => {
                let conditions = self
                    .conditions
                    .clone()
                    .ok_or_else(|| Error::MissingConditionEvaluator(name.to_string()))?;
                EvaluatorKind::OttlCondition(OttlConditionEvaluator::new(name, config, conditions))
            }
            PolicyKind::And(config) => {
                EvaluatorKind::And(AndEvaluator::new(self.build_children(name, &config.sub_policies)?))
            }
            PolicyKind::Drop(config) => EvaluatorKind::Drop(DropEvaluator::new(
                self.build_children(name, &config.sub_policies)?,
            )),
            PolicyKind::Composite(config) => {
                let children = self.build_children(name, &config.sub_policies)?;
                EvaluatorKind::Composite(CompositeEvaluator::new(name, config, children)?)
            }
        };

        debug!("Built policy '{}' ({})", name, policy.type_name());
        Ok(PolicyEvaluator::new(name, kind))
    }

    /// Builds sibling policies, rejecting duplicate names.
    ///
    /// # Errors
    ///
    /// Returns an error if two policies share a name or any policy is invalid.
    pub fn build_all(&self, policies: &[Policy]) -> Result<Vec<PolicyEvaluator>> {
        let mut seen = HashSet::new();
        policies
            .iter()
            .map(|policy| {
                if !seen.insert(policy.name.as_str()) {
                    return Err(Error::DuplicatePolicyName(policy.name.clone()));
                }
                self.build(policy)
            })
            .collect()
    }

    fn build_children(&self, parent: &str, sub_policies: &[Policy]) -> Result<Vec<PolicyEvaluator>> {
        if sub_policies.is_empty() {
            return Err(Error::EmptySubPolicies(parent.to_string()));
        }
        self.build_all(sub_policies)
    }
}

/// Builds one policy with a default [`Builder`].
///
/// # Errors
///
/// Returns an error if the policy is invalid or needs an OTTL evaluator.
pub fn build(policy: &Policy) -> Result<PolicyEvaluator> {
    Builder::new().build(policy)
}
