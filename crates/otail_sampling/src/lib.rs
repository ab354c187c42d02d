//! Tail-sampling policy evaluation for otail.
//!
//! Policies are compiled by a [`Builder`] into [`PolicyEvaluator`]s, and a
//! [`Sampler`] runs them against one trace at a time:
//!
//! ```rust,ignore
//! use otail_sampling::Sampler;
//!
//! let policies = otail_policy::parse_yaml(&config)?;
//! let mut sampler = Sampler::from_policies(&policies)?;
//! let result = sampler.make_decision(&trace, now_ns);
//! println!("{}", result.final_decision);
//! ```
//!
//! Evaluation is synchronous and never fails: evaluator faults surface as
//! [`Decision::Error`]. Rate-limited policies own their token buckets, so a
//! `Sampler` is driven from one thread with a monotonic clock.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]

pub mod bucket;
pub mod builder;
pub mod combinator;
pub mod decision;
pub mod error;
pub mod evaluator;
pub mod evaluators;
pub mod ottl;
pub mod predicate;
pub mod simulation;

pub use bucket::TokenBucket;
pub use builder::{build, Builder};
pub use combinator::{make_decision, reduce, DecisionResult, Sampler};
pub use decision::Decision;
pub use error::{Error, Result};
pub use evaluator::{EvaluatorKind, PolicyEvaluator};
pub use ottl::{ConditionContext, ConditionError, ConditionEvaluator, UnavailableConditions};
pub use simulation::{SimulationConfig, SimulationResult, SimulationRow, SimulationSummary, Simulator};
