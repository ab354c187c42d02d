//! Error types for policy configuration parsing.

use thiserror::Error;

/// Errors that can occur while reading or writing policy configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration is well-formed YAML or JSON but not a policy document.
    #[error("parse error: {reason}")]
    Parse {
        /// Reason for the parse failure.
        reason: String,
    },

    /// A policy `type` names no known policy.
    #[error("unknown policy type '{policy_type}' in policy '{policy}'")]
    UnknownPolicyType {
        /// The policy name.
        policy: String,
        /// The unrecognized type.
        policy_type: String,
    },

    /// A policy lacks the section named after its type.
    #[error("policy '{policy}' has no '{policy_type}' section")]
    MissingPolicyConfig {
        /// The policy name.
        policy: String,
        /// The policy type, which is also the expected section name.
        policy_type: String,
    },

    /// Missing required field.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// YAML syntax or serialization error.
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// JSON syntax or serialization error.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias for policy configuration operations.
pub type Result<T> = std::result::Result<T, Error>;
