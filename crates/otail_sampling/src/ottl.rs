//! Boundary to an external OTTL condition evaluator.
//!
//! The expression language lives outside this crate. `ottl_condition` policies
//! hand their condition lists and the span (or span event) under test to a
//! [`ConditionEvaluator`] and only interpret the result.

use otail_trace::{Resource, Scope, Span, SpanEvent};
use thiserror::Error;

/// What a condition list is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum ConditionContext<'a> {
    /// A span with its resource and scope.
    Span {
        /// The emitting resource.
        resource: &'a Resource,
        /// The instrumentation scope.
        scope: &'a Scope,
        /// The span.
        span: &'a Span,
    },
    /// One event of a span.
    SpanEvent {
        /// The emitting resource.
        resource: &'a Resource,
        /// The instrumentation scope.
        scope: &'a Scope,
        /// The span owning the event.
        span: &'a Span,
        /// The event.
        event: &'a SpanEvent,
    },
}

impl<'a> ConditionContext<'a> {
    /// The span under test, or the span owning the event.
    #[must_use]
    pub const fn span(&self) -> &'a Span {
        match *self {
            Self::Span { span, .. } | Self::SpanEvent { span, .. } => span,
        }
    }
}

/// A condition evaluation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("condition evaluation failed: {message}")]
pub struct ConditionError {
    /// Description of the failure.
    pub message: String,
}

impl ConditionError {
    /// Creates a condition error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Evaluates OTTL condition lists.
pub trait ConditionEvaluator: Send + Sync {
    /// Returns true if any of `conditions` holds for `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if a condition cannot be parsed or evaluated.
    fn evaluate_conditions(
        &self,
        conditions: &[String],
        context: &ConditionContext<'_>,
    ) -> Result<bool, ConditionError>;
}

/// A [`ConditionEvaluator`] for hosts without an OTTL runtime.
///
/// Every evaluation fails, so policies fall back to their error mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableConditions;

impl ConditionEvaluator for UnavailableConditions {
    fn evaluate_conditions(
        &self,
        conditions: &[String],
        _context: &ConditionContext<'_>,
    ) -> Result<bool, ConditionError> {
        Err(ConditionError::new(format!(
            "no OTTL runtime available to evaluate {} condition(s)",
            conditions.len()
        )))
    }
}
