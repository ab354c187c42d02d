//! Trace data model.
//!
//! A trace is an immutable tree: `Trace -> ResourceSpan[] -> ScopeSpan[] -> Span[]`.

use crate::span::{AttributeValue, Attributes, Span};
use serde::{Deserialize, Serialize};

/// One distributed request, as a tree of resource-scoped spans.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trace {
    /// Trace identifier. May be empty for raw OTLP exports.
    #[serde(default)]
    pub trace_id: String,
    /// Spans grouped by the resource that emitted them.
    #[serde(default)]
    pub resource_spans: Vec<ResourceSpan>,
}

/// Spans emitted by one resource (process, pod, host).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpan {
    /// The emitting resource.
    #[serde(default)]
    pub resource: Resource,
    /// Spans grouped by instrumentation scope.
    #[serde(default)]
    pub scope_spans: Vec<ScopeSpan>,
}

/// Resource attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Resource {
    /// Resource attributes, e.g. `service.name`.
    #[serde(default)]
    pub attributes: Attributes,
}

/// Spans emitted by one instrumentation scope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScopeSpan {
    /// The instrumentation scope.
    #[serde(default)]
    pub scope: Scope,
    /// The spans.
    #[serde(default)]
    pub spans: Vec<Span>,
}

/// An instrumentation scope (library name and version).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scope {
    /// Library name.
    #[serde(default)]
    pub name: String,
    /// Library version.
    #[serde(default)]
    pub version: String,
    /// Scope attributes.
    #[serde(default)]
    pub attributes: Attributes,
}

impl Trace {
    /// Creates an empty trace with the given ID.
    #[must_use]
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            resource_spans: Vec::new(),
        }
    }

    /// Creates a trace with a single resource and scope holding `spans`.
    #[must_use]
    pub fn from_spans(trace_id: impl Into<String>, spans: Vec<Span>) -> Self {
        Self::new(trace_id).with_resource_span(ResourceSpan::new().with_spans(spans))
    }

    /// Appends a resource span.
    #[must_use]
    pub fn with_resource_span(mut self, resource_span: ResourceSpan) -> Self {
        self.resource_spans.push(resource_span);
        self
    }

    /// Iterates over every span in traversal order.
    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.resource_spans
            .iter()
            .flat_map(|rs| rs.scope_spans.iter())
            .flat_map(|ss| ss.spans.iter())
    }

    /// Total number of spans across all resources and scopes.
    #[must_use]
    pub fn span_count(&self) -> usize {
        self.resource_spans
            .iter()
            .flat_map(|rs| rs.scope_spans.iter())
            .map(|ss| ss.spans.len())
            .sum()
    }

    /// Returns the trace ID, falling back to the first span that carries one.
    #[must_use]
    pub fn effective_trace_id(&self) -> Option<&str> {
        if !self.trace_id.is_empty() {
            return Some(&self.trace_id);
        }
        self.spans()
            .map(|span| span.trace_id.as_str())
            .find(|id| !id.is_empty())
    }
}

impl ResourceSpan {
    /// Creates an empty resource span.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource attribute.
    #[must_use]
    pub fn with_resource_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.resource.attributes.insert(key, value);
        self
    }

    /// Appends a scope span.
    #[must_use]
    pub fn with_scope_span(mut self, scope_span: ScopeSpan) -> Self {
        self.scope_spans.push(scope_span);
        self
    }

    /// Appends a scope span with an anonymous scope holding `spans`.
    #[must_use]
    pub fn with_spans(self, spans: Vec<Span>) -> Self {
        self.with_scope_span(ScopeSpan::new(spans))
    }
}

impl ScopeSpan {
    /// Creates a scope span with an anonymous scope.
    #[must_use]
    pub fn new(spans: Vec<Span>) -> Self {
        Self {
            scope: Scope::default(),
            spans,
        }
    }

    /// Sets the instrumentation scope.
    #[must_use]
    pub fn with_scope(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.scope.name = name.into();
        self.scope.version = version.into();
        self
    }
}
