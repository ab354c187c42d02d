//! Tail-sampling policy model and configuration parsing for Otail.
//!
//! This crate provides:
//! - The typed [`Policy`] model, one variant per policy type
//! - OpenTelemetry Collector `tail_sampling` YAML parsing and serialization
//! - JSON policy documents
//!
//! # Example
//!
//! ```rust,ignore
//! use otail_policy::{parse_yaml, PolicyKind};
//!
//! let policies = parse_yaml(&std::fs::read_to_string("collector.yaml")?)?;
//! for policy in &policies {
//!     println!("{} ({})", policy.name, policy.type_name());
//! }
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod model;
pub mod parser;

pub use error::{Error, Result};
pub use model::{
    AndConfig, BooleanAttributeConfig, CompositeConfig, CompositeOperator, DropConfig,
    ErrorMode, LatencyConfig, NumericAttributeConfig, OttlConditionConfig, Policy, PolicyKind,
    ProbabilisticConfig, RateAllocation, RateLimitingConfig, SpanCountConfig, StatusCodeConfig,
    StringAttributeConfig, TraceStateConfig,
};
pub use parser::{parse_config, parse_json, parse_yaml, to_json, to_yaml, TailSamplingConfig};
