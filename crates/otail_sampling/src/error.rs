//! Error types for building policy evaluators.
//!
//! Evaluation itself never fails; faults surface as [`Decision::Error`].
//!
//! [`Decision::Error`]: crate::Decision::Error

use thiserror::Error;

/// Configuration errors found while building evaluators.
#[derive(Debug, Error)]
pub enum Error {
    /// Sampling percentage outside `0..=100`.
    #[error("policy '{policy}': sampling percentage {percentage} is outside 0..=100")]
    InvalidSamplingPercentage {
        /// The policy name.
        policy: String,
        /// The rejected percentage.
        percentage: f64,
    },

    /// A rate allocation names no sub-policy.
    #[error("policy '{policy}': rate allocation references unknown sub-policy '{sub_policy}'")]
    UnknownRateAllocationPolicy {
        /// The composite policy name.
        policy: String,
        /// The unknown sub-policy name.
        sub_policy: String,
    },

    /// Rate allocation percentages sum past 100.
    #[error("policy '{policy}': rate allocations sum to {total}%, which exceeds 100%")]
    RateAllocationOverflow {
        /// The composite policy name.
        policy: String,
        /// The allocation total.
        total: u32,
    },

    /// A policy order entry names no sub-policy.
    #[error("policy '{policy}': policy order references unknown sub-policy '{sub_policy}'")]
    UnknownPolicyOrderEntry {
        /// The composite policy name.
        policy: String,
        /// The unknown sub-policy name.
        sub_policy: String,
    },

    /// Two sibling policies share a name.
    #[error("duplicate policy name '{0}'")]
    DuplicatePolicyName(String),

    /// A group policy has no sub-policies.
    #[error("policy '{0}' has no sub-policies")]
    EmptySubPolicies(String),

    /// A string attribute pattern does not compile.
    #[error("policy '{policy}': invalid regex '{pattern}': {source}")]
    InvalidRegex {
        /// The policy name.
        policy: String,
        /// The rejected pattern.
        pattern: String,
        /// The regex compilation error.
        #[source]
        source: regex::Error,
    },

    /// An OTTL policy was built without a condition evaluator.
    #[error("policy '{0}' needs a condition evaluator")]
    MissingConditionEvaluator(String),

    /// Numeric range with `min > max`.
    #[error("policy '{policy}': min value {min} is greater than max value {max}")]
    InvalidNumericRange {
        /// The policy name.
        policy: String,
        /// The lower bound.
        min: i64,
        /// The upper bound.
        max: i64,
    },
}

/// Result type alias for evaluator construction.
pub type Result<T> = std::result::Result<T, Error>;
