//! Trace data model for Otail.
//!
//! This crate provides:
//! - The `Trace -> ResourceSpan -> ScopeSpan -> Span` tree evaluated by sampling policies
//! - Lenient JSON loading of OTLP exports and hand-written trace files
//! - Seeded synthetic traces for simulations and tests
//!
//! # Example
//!
//! ```rust,ignore
//! use otail_trace::{loader, Trace};
//!
//! let traces = loader::load_traces("traces.json")?;
//! let total: usize = traces.iter().map(Trace::span_count).sum();
//! ```

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::items_after_statements)]

pub mod error;
pub mod fixtures;
pub mod loader;
pub mod span;
pub mod trace;

pub use error::{Error, Result};
pub use span::{
    AttributeValue, Attributes, Span, SpanEvent, SpanKind, SpanStatus, StatusCode, Timestamp,
};
pub use trace::{Resource, ResourceSpan, Scope, ScopeSpan, Trace};
