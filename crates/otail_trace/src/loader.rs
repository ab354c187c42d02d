//! Trace loading from JSON text, files and directories.
//!
//! Accepted shapes:
//! - a single trace object (`{"traceId": ..., "resourceSpans": [...]}`), which also
//!   covers a raw OTLP/JSON export with no `traceId`
//! - a JSON array of trace objects
//! - an object with a `traces` field containing the array

use crate::error::{Error, Result};
use crate::span::{Span, SpanKind, SpanStatus};
use crate::trace::{ResourceSpan, ScopeSpan, Trace};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Parses a single trace from JSON.
///
/// # Errors
///
/// Returns an error if the JSON is invalid or not a trace object.
pub fn parse_trace(json: &str) -> Result<Trace> {
    let trace: Trace = serde_json::from_str(json)?;
    if trace.resource_spans.is_empty() {
        debug!("Parsed trace '{}' has no resource spans", trace.trace_id);
    }
    Ok(trace)
}

/// Parses one or many traces from JSON.
///
/// # Errors
///
/// Returns an error if the JSON matches none of the accepted shapes.
pub fn parse_traces(json: &str) -> Result<Vec<Trace>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TraceDocument {
        Many(Vec<Trace>),
        Wrapped { traces: Vec<Trace> },
        One(Trace),
    }

    let document: TraceDocument = serde_json::from_str(json).map_err(|e| {
        Error::parse(
            "json",
            format!("expected a trace, an array of traces or {{\"traces\": [...]}}: {e}"),
        )
    })?;

    Ok(match document {
        TraceDocument::Many(traces) | TraceDocument::Wrapped { traces } => traces,
        TraceDocument::One(trace) => vec![trace],
    })
}

/// Loads a single trace from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Trace> {
    let path = path.as_ref();
    info!("Loading trace from {}", path.display());

    let content = std::fs::read_to_string(path)?;
    parse_trace(&content)
}

/// Loads every trace from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_traces(path: impl AsRef<Path>) -> Result<Vec<Trace>> {
    let path = path.as_ref();
    info!("Loading traces from {}", path.display());

    let content = std::fs::read_to_string(path)?;
    parse_traces(&content)
}

/// Loads traces from every `.json` file in a directory.
///
/// Files that fail to parse are skipped with a warning.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn load_directory(path: impl AsRef<Path>) -> Result<Vec<Trace>> {
    let path = path.as_ref();
    info!("Loading traces from directory {}", path.display());

    let mut entries: Vec<_> = std::fs::read_dir(path)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect();
    entries.sort();

    let mut traces = Vec::new();
    for file_path in entries {
        debug!("Loading {}", file_path.display());
        match load_traces(&file_path) {
            Ok(mut loaded) => traces.append(&mut loaded),
            Err(e) => warn!("Failed to load {}: {}", file_path.display(), e),
        }
    }

    info!("Loaded {} traces from directory", traces.len());
    Ok(traces)
}

/// Returns the example trace shown to new users: one `process-request` server span.
#[must_use]
pub fn example_trace() -> Trace {
    let span = Span::new("eee19b7ec3c1b174", "process-request")
        .with_trace_id("5b8efff798038103d269b633813fc60c")
        .with_parent("eee19b7ec3c1b173")
        .with_kind(SpanKind::Server)
        .with_times(1_544_712_660_000_000_000, 1_544_712_661_000_000_000)
        .with_status(SpanStatus::default())
        .with_attribute("http.method", "GET")
        .with_attribute("http.url", "http://example.com/api/data")
        .with_attribute("http.status_code", "200");

    Trace::new("5b8efff798038103d269b633813fc60c").with_resource_span(
        ResourceSpan::new()
            .with_resource_attribute("service.name", "example-service")
            .with_resource_attribute("deployment.environment", "production")
            .with_scope_span(ScopeSpan::new(vec![span]).with_scope("my.library", "1.0.0")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::AttributeValue;
    use proptest::prelude::*;

    const OTLP_EXPORT: &str = r#"{
        "resourceSpans": [{
            "resource": {
                "attributes": [
                    {"key": "service.name", "value": {"stringValue": "example-service"}}
                ]
            },
            "scopeSpans": [{
                "scope": {"name": "my.library", "version": "1.0.0"},
                "spans": [{
                    "traceId": "5b8efff798038103d269b633813fc60c",
                    "spanId": "eee19b7ec3c1b174",
                    "name": "process-request",
                    "kind": 2,
                    "startTimeUnixNano": "1544712660000000000",
                    "endTimeUnixNano": "1544712661000000000",
                    "attributes": [
                        {"key": "http.method", "value": {"stringValue": "GET"}}
                    ],
                    "status": {}
                }]
            }]
        }]
    }"#;

    #[test]
    fn parse_otlp_export() {
        let trace = parse_trace(OTLP_EXPORT).unwrap();

        assert_eq!(trace.trace_id, "");
        assert_eq!(trace.effective_trace_id(), Some("5b8efff798038103d269b633813fc60c"));
        assert_eq!(trace.span_count(), 1);

        let span = trace.spans().next().unwrap();
        assert_eq!(span.kind, SpanKind::Server);
        assert_eq!(span.get_attribute("http.method"), Some(&AttributeValue::from("GET")));
        assert_eq!(
            trace.resource_spans[0].scope_spans[0].scope.name,
            "my.library"
        );
    }

    #[test]
    fn parse_console_shape() {
        let json = r#"{
            "traceId": "abc",
            "resourceSpans": [{
                "resource": {"attributes": {"service.name": "api"}},
                "scopeSpans": [{
                    "spans": [{
                        "traceId": "abc", "spanId": "1", "name": "GET /",
                        "kind": "SERVER", "startTime": 0, "endTime": 5,
                        "attributes": {"http.status_code": 500},
                        "status": {"code": "ERROR", "message": "boom"},
                        "events": [{"time": 3, "name": "exception", "attributes": {}}]
                    }]
                }]
            }]
        }"#;

        let trace = parse_trace(json).unwrap();
        let span = trace.spans().next().unwrap();
        assert!(span.is_error());
        assert_eq!(span.events.len(), 1);
        assert_eq!(span.events[0].time_unix_nano.as_nanos(), Some(3));
    }

    #[test]
    fn parse_many_shapes() {
        let array = r#"[{"traceId": "a"}, {"traceId": "b"}]"#;
        let wrapped = r#"{"traces": [{"traceId": "a"}]}"#;

        assert_eq!(parse_traces(array).unwrap().len(), 2);
        assert_eq!(parse_traces(wrapped).unwrap().len(), 1);
        assert_eq!(parse_traces(OTLP_EXPORT).unwrap().len(), 1);
    }

    #[test]
    fn parse_traces_rejects_garbage() {
        assert!(matches!(
            parse_traces("42"),
            Err(Error::ParseError { format: "json", .. })
        ));
    }

    #[test]
    fn example_trace_is_well_formed() {
        let trace = example_trace();
        assert_eq!(trace.span_count(), 1);
        assert_eq!(trace.effective_trace_id(), Some("5b8efff798038103d269b633813fc60c"));
    }

    proptest! {
        #[test]
        fn parse_traces_never_panics(input in ".{0,200}") {
            let _ = parse_traces(&input);
        }

        #[test]
        fn parse_traces_keeps_every_entry(ids in proptest::collection::vec("[0-9a-f]{32}", 0..8)) {
            let json = format!(
                "[{}]",
                ids.iter()
                    .map(|id| format!(r#"{{"traceId": "{id}"}}"#))
                    .collect::<Vec<_>>()
                    .join(",")
            );

            let traces = parse_traces(&json).unwrap();
            prop_assert_eq!(traces.len(), ids.len());
            for (trace, id) in traces.iter().zip(&ids) {
                prop_assert_eq!(&trace.trace_id, id);
            }
        }
    }
}
