//! Trace walkers shared by the attribute, status and trace-state evaluators.
//!
//! Traversal is interleaved: for each resource span, the resource is tested
//! first, then every span of its scope spans in order. Walks stop at the first
//! decisive node.
//!
//! An empty trace matches nothing: the positive walkers return
//! [`Decision::NotSampled`] and the inverted walkers return
//! [`Decision::InvertSampled`].

use crate::decision::Decision;
use otail_trace::{Attributes, Resource, Span, Trace};

/// A node visited by the walkers.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// A resource.
    Resource(&'a Resource),
    /// A span.
    Span(&'a Span),
}

impl<'a> Node<'a> {
    /// Attributes of the node.
    #[must_use]
    pub const fn attributes(self) -> &'a Attributes {
        match self {
            Self::Resource(resource) => &resource.attributes,
            Self::Span(span) => &span.attributes,
        }
    }
}

fn any_node<'a>(trace: &'a Trace, mut predicate: impl FnMut(Node<'a>) -> bool) -> bool {
    trace.resource_spans.iter().any(|rs| {
        predicate(Node::Resource(&rs.resource))
            || rs
                .scope_spans
                .iter()
                .flat_map(|ss| &ss.spans)
                .any(|span| predicate(Node::Span(span)))
    })
}

fn all_nodes<'a>(trace: &'a Trace, mut predicate: impl FnMut(Node<'a>) -> bool) -> bool {
    !any_node(trace, |node| !predicate(node))
}

/// `Sampled` if any resource satisfies `resource_pred` or any span satisfies `span_pred`.
pub fn has_resource_or_span_with_condition(
    trace: &Trace,
    mut resource_pred: impl FnMut(&Resource) -> bool,
    mut span_pred: impl FnMut(&Span) -> bool,
) -> Decision {
    Decision::from_match(any_node(trace, |node| match node {
        Node::Resource(resource) => resource_pred(resource),
        Node::Span(span) => span_pred(span),
    }))
}

/// `InvertSampled` if every resource and span satisfies its (inverted) predicate,
/// `InvertNotSampled` at the first one that does not.
pub fn invert_has_resource_or_span_with_condition(
    trace: &Trace,
    mut resource_pred: impl FnMut(&Resource) -> bool,
    mut span_pred: impl FnMut(&Span) -> bool,
) -> Decision {
    let passed = all_nodes(trace, |node| match node {
        Node::Resource(resource) => resource_pred(resource),
        Node::Span(span) => span_pred(span),
    });
    if passed {
        Decision::InvertSampled
    } else {
        Decision::InvertNotSampled
    }
}

/// `Sampled` if any span satisfies `span_pred`.
pub fn has_span_with_condition(trace: &Trace, span_pred: impl FnMut(&Span) -> bool) -> Decision {
    Decision::from_match(trace.spans().any(span_pred))
}

/// Applies one attribute predicate to resource and span attributes alike.
pub fn has_attribute_with_condition(
    trace: &Trace,
    mut predicate: impl FnMut(&Attributes) -> bool,
) -> Decision {
    Decision::from_match(any_node(trace, |node| predicate(node.attributes())))
}

/// Inverted form of [`has_attribute_with_condition`].
pub fn invert_has_attribute_with_condition(
    trace: &Trace,
    mut predicate: impl FnMut(&Attributes) -> bool,
) -> Decision {
    if all_nodes(trace, |node| predicate(node.attributes())) {
        Decision::InvertSampled
    } else {
        Decision::InvertNotSampled
    }
}

/// Total span count across every resource and scope.
pub fn get_span_count(trace: &Trace) -> usize {
    trace.span_count()
}
