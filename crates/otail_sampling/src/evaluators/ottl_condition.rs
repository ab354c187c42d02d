//! Delegation to an external OTTL condition evaluator.

use crate::decision::Decision;
use crate::ottl::{ConditionContext, ConditionError, ConditionEvaluator};
use otail_policy::{ErrorMode, OttlConditionConfig};
use otail_trace::Trace;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Samples a trace when any span, or any span event, satisfies its conditions.
///
/// Spans are tested before their events. A condition fault yields
/// [`Decision::Error`] under [`ErrorMode::Propagate`]; otherwise the span or
/// event is treated as a non-match.
#[derive(Clone)]
pub struct OttlConditionEvaluator {
    policy: String,
    error_mode: ErrorMode,
    span_conditions: Vec<String>,
    span_event_conditions: Vec<String>,
    conditions: Arc<dyn ConditionEvaluator>,
}

impl fmt::Debug for OttlConditionEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OttlConditionEvaluator")
            .field("policy", &self.policy)
            .field("error_mode", &self.error_mode)
            .field("span_conditions", &self.span_conditions)
            .field("span_event_conditions", &self.span_event_conditions)
            .finish_non_exhaustive()
    }
}

impl OttlConditionEvaluator {
    /// Creates the evaluator.
    pub fn new(
        policy: &str,
        config: &OttlConditionConfig,
        conditions: Arc<dyn ConditionEvaluator>,
    ) -> Self {
        Self {
            policy: policy.to_string(),
            error_mode: config.error_mode,
            span_conditions: config.span_conditions.clone(),
            span_event_conditions: config.span_event_conditions.clone(),
            conditions,
        }
    }

    /// Evaluates the trace.
    pub fn evaluate(&self, trace: &Trace) -> Decision {
        for rs in &trace.resource_spans {
            for ss in &rs.scope_spans {
                for span in &ss.spans {
                    if !self.span_conditions.is_empty() {
                        let context = ConditionContext::Span {
                            resource: &rs.resource,
                            scope: &ss.scope,
                            span,
                        };
                        if let Some(decision) = self.check(&self.span_conditions, &context) {
                            return decision;
                        }
                    }

                    if self.span_event_conditions.is_empty() {
                        continue;
                    }
                    for event in &span.events {
                        let context = ConditionContext::SpanEvent {
                            resource: &rs.resource,
                            scope: &ss.scope,
                            span,
                            event,
                        };
                        if let Some(decision) =
                            self.check(&self.span_event_conditions, &context)
                        {
                            return decision;
                        }
                    }
                }
            }
        }

        Decision::NotSampled
    }

    /// Returns a decision if evaluation should stop here.
    fn check(&self, conditions: &[String], context: &ConditionContext<'_>) -> Option<Decision> {
        match self.conditions.evaluate_conditions(conditions, context) {
            Ok(true) => Some(Decision::Sampled),
            Ok(false) => None,
            Err(err) => self.on_error(&err, context),
        }
    }

    fn on_error(&self, err: &ConditionError, context: &ConditionContext<'_>) -> Option<Decision> {
        match self.error_mode {
            ErrorMode::Propagate => {
                warn!(
                    "Policy '{}' failed on span '{}': {}",
                    self.policy,
                    context.span().span_id,
                    err
                );
                Some(Decision::Error)
            }
            ErrorMode::Ignore => {
                warn!(
                    "Policy '{}' ignoring failure on span '{}': {}",
                    self.policy,
                    context.span().span_id,
                    err
                );
                None
            }
            ErrorMode::Silent => None,
        }
    }
}
