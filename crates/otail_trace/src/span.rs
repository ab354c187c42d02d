//! Span data model.
//!
//! Spans are the leaves of the trace tree. Every field accepts both the
//! console's plain JSON shape and the OTLP/JSON encoding (string timestamps,
//! integer enums, `KeyValue` attribute lists).

use crate::error::Error;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// The kind of span (client, server, internal, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanKind {
    /// Unspecified span kind.
    #[default]
    Unspecified,
    /// An internal operation within an application.
    Internal,
    /// Handling a synchronous request from a client.
    Server,
    /// Making a synchronous request to a server.
    Client,
    /// Initiating an asynchronous request.
    Producer,
    /// Handling an asynchronous request.
    Consumer,
}

impl SpanKind {
    /// Converts an OTLP span kind integer to `SpanKind`.
    #[must_use]
    pub const fn from_otlp(value: i64) -> Self {
        match value {
            1 => Self::Internal,
            2 => Self::Server,
            3 => Self::Client,
            4 => Self::Producer,
            5 => Self::Consumer,
            _ => Self::Unspecified,
        }
    }
}

impl FromStr for SpanKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("SPAN_KIND_").unwrap_or(&upper) {
            "UNSPECIFIED" | "" => Ok(Self::Unspecified),
            "INTERNAL" => Ok(Self::Internal),
            "SERVER" => Ok(Self::Server),
            "CLIENT" => Ok(Self::Client),
            "PRODUCER" => Ok(Self::Producer),
            "CONSUMER" => Ok(Self::Consumer),
            _ => Err(Error::InvalidTrace(format!("unknown span kind: {s}"))),
        }
    }
}

impl<'de> Deserialize<'de> for SpanKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match CodeOrName::deserialize(deserializer)? {
            CodeOrName::Code(code) => Ok(Self::from_otlp(code)),
            CodeOrName::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

/// Status code indicating span success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCode {
    /// Status not set.
    #[default]
    Unset,
    /// The operation completed successfully.
    Ok,
    /// The operation resulted in an error.
    Error,
}

impl StatusCode {
    /// Converts an OTLP status code integer to `StatusCode`.
    #[must_use]
    pub const fn from_otlp(value: i64) -> Self {
        match value {
            1 => Self::Ok,
            2 => Self::Error,
            _ => Self::Unset,
        }
    }

    /// Returns the canonical collector spelling (`OK`, `ERROR`, `UNSET`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unset => "UNSET",
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }

    /// Returns true if this status represents an error.
    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.strip_prefix("STATUS_CODE_").unwrap_or(&upper) {
            "UNSET" => Ok(Self::Unset),
            "OK" => Ok(Self::Ok),
            "ERROR" => Ok(Self::Error),
            _ => Err(Error::InvalidTrace(format!("unknown status code: {s}"))),
        }
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match CodeOrName::deserialize(deserializer)? {
            CodeOrName::Code(code) => Ok(Self::from_otlp(code)),
            CodeOrName::Name(name) => name.parse().map_err(de::Error::custom),
        }
    }
}

/// OTLP/JSON enums arrive either as their integer value or their name.
#[derive(Deserialize)]
#[serde(untagged)]
enum CodeOrName {
    Code(i64),
    Name(String),
}

/// Status of a span operation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpanStatus {
    /// The status code.
    #[serde(default)]
    pub code: StatusCode,
    /// Optional status message (typically for errors).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SpanStatus {
    /// Creates a new span status with the given code.
    #[must_use]
    pub const fn new(code: StatusCode) -> Self {
        Self {
            code,
            message: None,
        }
    }

    /// Creates an error status with a message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::Error,
            message: Some(message.into()),
        }
    }

    /// Creates an OK status.
    #[must_use]
    pub const fn ok() -> Self {
        Self::new(StatusCode::Ok)
    }
}

/// A value that can be stored as a resource, span or event attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// A string value.
    String(String),
    /// A 64-bit integer value.
    Int(i64),
    /// A 64-bit floating-point value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
}

impl AttributeValue {
    /// Converts this value to a string representation.
    #[must_use]
    pub fn as_string(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Bool(b) => b.to_string(),
        }
    }

    /// Returns the value as an f64 if it is numeric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as a bool if it is a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as a string reference if it is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Key/value attribute mapping. Insertion order is irrelevant.
///
/// Deserializes from a plain JSON object or from an OTLP `KeyValue` list.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct Attributes(HashMap<String, AttributeValue>);

impl Attributes {
    /// Creates an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets an attribute value by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    /// Inserts or replaces an attribute.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns the number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over all attributes in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawAttributes {
            Map(HashMap<String, AttributeValue>),
            List(Vec<KeyValue>),
        }

        Ok(match Option::<RawAttributes>::deserialize(deserializer)? {
            None => Self::default(),
            Some(RawAttributes::Map(map)) => Self(map),
            Some(RawAttributes::List(list)) => list
                .into_iter()
                .filter_map(|kv| {
                    let value = kv.value.and_then(AnyValue::into_attribute)?;
                    Some((kv.key, value))
                })
                .collect(),
        })
    }
}

/// OTLP/JSON attribute entry.
#[derive(Deserialize)]
struct KeyValue {
    key: String,
    #[serde(default)]
    value: Option<AnyValue>,
}

/// OTLP/JSON `AnyValue`; int64 values are encoded as strings by OTLP/JSON.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnyValue {
    #[serde(default)]
    string_value: Option<String>,
    #[serde(default)]
    int_value: Option<IntOrString>,
    #[serde(default)]
    double_value: Option<f64>,
    #[serde(default)]
    bool_value: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    String(String),
}

impl AnyValue {
    fn into_attribute(self) -> Option<AttributeValue> {
        if let Some(s) = self.string_value {
            return Some(AttributeValue::String(s));
        }
        if let Some(i) = self.int_value {
            return match i {
                IntOrString::Int(i) => Some(AttributeValue::Int(i)),
                IntOrString::String(s) => s.parse().ok().map(AttributeValue::Int),
            };
        }
        if let Some(f) = self.double_value {
            return Some(AttributeValue::Float(f));
        }
        self.bool_value.map(AttributeValue::Bool)
    }
}

/// A timestamp in nanoseconds since the Unix epoch.
///
/// OTLP/JSON encodes these as decimal strings. A string that is not a valid
/// integer is kept verbatim so evaluators can report it instead of guessing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// A numeric timestamp.
    Nanos(u64),
    /// A textual timestamp, possibly malformed.
    Text(String),
}

impl Timestamp {
    /// Returns the timestamp in nanoseconds, or `None` if it is not numeric.
    #[must_use]
    pub fn as_nanos(&self) -> Option<u64> {
        match self {
            Self::Nanos(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::Nanos(0)
    }
}

impl From<u64> for Timestamp {
    fn from(n: u64) -> Self {
        Self::Nanos(n)
    }
}

/// A timestamped event recorded on a span.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanEvent {
    /// Event time.
    #[serde(default, alias = "time")]
    pub time_unix_nano: Timestamp,
    /// Event name.
    #[serde(default)]
    pub name: String,
    /// Event attributes.
    #[serde(default)]
    pub attributes: Attributes,
}

impl SpanEvent {
    /// Creates a new event with the given name and time.
    #[must_use]
    pub fn new(name: impl Into<String>, time_unix_nano: u64) -> Self {
        Self {
            time_unix_nano: Timestamp::Nanos(time_unix_nano),
            name: name.into(),
            attributes: Attributes::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key, value);
        self
    }
}

/// A span representing a unit of work within a trace.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Identifier of the trace this span belongs to.
    #[serde(default)]
    pub trace_id: String,
    /// Unique identifier for this span.
    #[serde(default)]
    pub span_id: String,
    /// Parent span ID, if this span has a parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    /// W3C `tracestate` header value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_state: Option<String>,
    /// The operation name.
    #[serde(default)]
    pub name: String,
    /// The kind of span.
    #[serde(default)]
    pub kind: SpanKind,
    /// Start time.
    #[serde(default, alias = "startTime")]
    pub start_time_unix_nano: Timestamp,
    /// End time. Not required to be after the start time.
    #[serde(default, alias = "endTime")]
    pub end_time_unix_nano: Timestamp,
    /// Span attributes.
    #[serde(default)]
    pub attributes: Attributes,
    /// The span status.
    #[serde(default)]
    pub status: SpanStatus,
    /// Span events.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SpanEvent>,
}

impl Span {
    /// Creates a new span with the given ID and name.
    #[must_use]
    pub fn new(span_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            span_id: span_id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets the trace ID.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = trace_id.into();
        self
    }

    /// Sets the parent span ID.
    #[must_use]
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(parent_id.into());
        self
    }

    /// Sets the W3C trace state.
    #[must_use]
    pub fn with_trace_state(mut self, trace_state: impl Into<String>) -> Self {
        self.trace_state = Some(trace_state.into());
        self
    }

    /// Sets the span kind.
    #[must_use]
    pub const fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets start and end times in nanoseconds.
    #[must_use]
    pub fn with_times(mut self, start_ns: u64, end_ns: u64) -> Self {
        self.start_time_unix_nano = Timestamp::Nanos(start_ns);
        self.end_time_unix_nano = Timestamp::Nanos(end_ns);
        self
    }

    /// Sets the span status.
    #[must_use]
    pub fn with_status(mut self, status: SpanStatus) -> Self {
        self.status = status;
        self
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    /// Adds an event.
    #[must_use]
    pub fn with_event(mut self, event: SpanEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Returns true if this is a root span (no parent).
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_span_id.as_deref().map_or(true, str::is_empty)
    }

    /// Returns true if this span represents an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status.code.is_error()
    }

    /// Gets an attribute value by key.
    #[must_use]
    pub fn get_attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    /// Start time in nanoseconds, if numeric.
    #[must_use]
    pub fn start_ns(&self) -> Option<u64> {
        self.start_time_unix_nano.as_nanos()
    }

    /// End time in nanoseconds, if numeric.
    #[must_use]
    pub fn end_ns(&self) -> Option<u64> {
        self.end_time_unix_nano.as_nanos()
    }
}
