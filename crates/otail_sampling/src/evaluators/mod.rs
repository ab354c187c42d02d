//! One evaluator per policy type.

mod and;
mod attribute;
mod composite;
mod drop;
mod latency;
mod ottl_condition;
mod probabilistic;
mod rate_limiting;
mod span_count;
mod status_code;
mod trace_state;

#[cfg(test)]
pub(crate) mod testing;

pub use and::AndEvaluator;
pub use attribute::{BooleanAttributeEvaluator, NumericAttributeEvaluator, StringAttributeEvaluator};
pub use composite::CompositeEvaluator;
pub use drop::DropEvaluator;
pub use latency::LatencyEvaluator;
pub use ottl_condition::OttlConditionEvaluator;
pub use probabilistic::{hash_trace_id, ProbabilisticEvaluator, DEFAULT_HASH_SALT};
pub use rate_limiting::RateLimitingEvaluator;
pub use span_count::SpanCountEvaluator;
pub use status_code::StatusCodeEvaluator;
pub use trace_state::TraceStateEvaluator;
