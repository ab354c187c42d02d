//! Collector configuration parser.
//!
//! Reads the `tail_sampling` processor section of an OpenTelemetry Collector
//! configuration into typed [`Policy`] values, and writes it back.
//!
//! # Format
//!
//! ```yaml
//! processors:
//!   tail_sampling:
//!     decision_wait: 10s
//!     policies:
//!       - name: errors
//!         type: status_code
//!         status_code: {status_codes: [ERROR]}
//!       - name: slow-checkout
//!         type: and
//!         and:
//!           and_sub_policy:
//!             - name: checkout
//!               type: string_attribute
//!               string_attribute: {key: service.name, values: [checkout]}
//!             - name: slow
//!               type: latency
//!               latency: {threshold_ms: 500}
//! ```
//!
//! The section may also sit at the top level (`tail_sampling:`), under a named
//! processor (`tail_sampling/<id>`), or be a bare `policies:` list.

use crate::error::{Error, Result};
use crate::model::{
    AndConfig, BooleanAttributeConfig, CompositeConfig, CompositeOperator, DropConfig,
    ErrorMode, LatencyConfig, NumericAttributeConfig, OttlConditionConfig, Policy, PolicyKind,
    ProbabilisticConfig, RateAllocation, RateLimitingConfig, SpanCountConfig, StatusCodeConfig,
    StringAttributeConfig, TraceStateConfig,
};
use otail_trace::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// The `tail_sampling` processor settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TailSamplingConfig {
    /// Time to wait for a trace to complete, e.g. `10s`.
    pub decision_wait: Option<String>,
    /// Number of traces kept in memory.
    pub num_traces: Option<u64>,
    /// Expected new traces per second.
    pub expected_new_traces_per_sec: Option<u64>,
    /// Top-level policies, in declaration order.
    pub policies: Vec<Policy>,
}

impl TailSamplingConfig {
    /// Wraps policies with default processor settings.
    #[must_use]
    pub fn new(policies: Vec<Policy>) -> Self {
        Self {
            policies,
            ..Self::default()
        }
    }

    /// Serializes to collector YAML under `processors.tail_sampling`.
    ///
    /// # Errors
    ///
    /// Returns an error if YAML serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        let raw = RawTailSampling {
            decision_wait: self.decision_wait.clone(),
            num_traces: self.num_traces,
            expected_new_traces_per_sec: self.expected_new_traces_per_sec,
            policies: encode_all(&self.policies)?,
        };
        render(&raw)
    }
}

/// Parses collector YAML into the `tail_sampling` settings.
///
/// # Errors
///
/// Returns an error if:
/// - The YAML syntax is invalid
/// - No `tail_sampling` section or `policies` list is present
/// - A policy has no name or type, an unknown type, or a malformed section
pub fn parse_config(input: &str) -> Result<TailSamplingConfig> {
    let document: Value = serde_yaml::from_str(input)?;
    let section = locate_tail_sampling(&document).ok_or_else(|| Error::Parse {
        reason: "missing tail_sampling processor".to_string(),
    })?;

    let raw: RawTailSampling =
        serde_yaml::from_value(section.clone()).map_err(|e| Error::Parse {
            reason: format!("invalid tail_sampling section: {e}"),
        })?;

    let policies = decode_all(raw.policies)?;
    debug!("Parsed {} tail_sampling policies", policies.len());

    Ok(TailSamplingConfig {
        decision_wait: raw.decision_wait,
        num_traces: raw.num_traces,
        expected_new_traces_per_sec: raw.expected_new_traces_per_sec,
        policies,
    })
}

/// Parses collector YAML into its top-level policies.
///
/// # Errors
///
/// See [`parse_config`].
///
/// # Example
///
/// ```rust
/// use otail_policy::parse_yaml;
///
/// let input = r#"
/// tail_sampling:
///   policies:
///     - name: keep-everything
///       type: always_sample
/// "#;
///
/// let policies = parse_yaml(input).unwrap();
/// assert_eq!(policies[0].name, "keep-everything");
/// ```
pub fn parse_yaml(input: &str) -> Result<Vec<Policy>> {
    Ok(parse_config(input)?.policies)
}

/// Serializes policies to collector YAML under `processors.tail_sampling`.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn to_yaml(policies: &[Policy]) -> Result<String> {
    let raw = RawTailSampling {
        policies: encode_all(policies)?,
        ..RawTailSampling::default()
    };
    render(&raw)
}

/// Parses a JSON policy document.
///
/// Accepts a single policy, an array of policies, or `{"policies": [...]}`.
///
/// # Errors
///
/// Returns an error if the JSON matches none of the accepted shapes.
pub fn parse_json(input: &str) -> Result<Vec<Policy>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PolicyDocument {
        Many(Vec<Policy>),
        Wrapped { policies: Vec<Policy> },
        One(Policy),
    }

    let document: PolicyDocument = serde_json::from_str(input)?;
    Ok(match document {
        PolicyDocument::Many(policies) | PolicyDocument::Wrapped { policies } => policies,
        PolicyDocument::One(policy) => vec![policy],
    })
}

/// Serializes policies to a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn to_json(policies: &[Policy]) -> Result<String> {
    Ok(serde_json::to_string_pretty(policies)?)
}

fn locate_tail_sampling(document: &Value) -> Option<&Value> {
    if let Some(Value::Mapping(processors)) = document.get("processors") {
        let found = processors.iter().find(|(key, _)| {
            key.as_str()
                .is_some_and(|k| k == "tail_sampling" || k.starts_with("tail_sampling/"))
        });
        if let Some((_, section)) = found {
            return Some(section);
        }
    }

    if let Some(section) = document.get("tail_sampling") {
        return Some(section);
    }

    document.get("policies").map(|_| document)
}

fn render(raw: &RawTailSampling) -> Result<String> {
    let mut processors = Mapping::new();
    processors.insert(
        Value::String("tail_sampling".to_string()),
        serde_yaml::to_value(raw)?,
    );

    let mut root = Mapping::new();
    root.insert(
        Value::String("processors".to_string()),
        Value::Mapping(processors),
    );

    Ok(serde_yaml::to_string(&root)?)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawTailSampling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    decision_wait: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    num_traces: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_new_traces_per_sec: Option<u64>,
    #[serde(default)]
    policies: Vec<RawPolicy>,
}

/// A policy entry: `name`, `type`, and a section keyed by the type.
#[derive(Debug, Serialize, Deserialize)]
struct RawPolicy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    policy_type: Option<String>,
    #[serde(flatten)]
    sections: BTreeMap<String, Value>,
}

#[derive(Serialize, Deserialize)]
struct ProbabilisticSection {
    sampling_percentage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hash_salt: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct RateLimitingSection {
    spans_per_second: u64,
}

#[derive(Serialize, Deserialize)]
struct StatusCodeSection {
    status_codes: Vec<StatusCode>,
}

#[derive(Serialize, Deserialize)]
struct StringAttributeSection {
    key: String,
    values: Vec<String>,
    #[serde(default)]
    enabled_regex_matching: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    cache_max_size: Option<usize>,
    #[serde(default)]
    invert_match: bool,
}

#[derive(Serialize, Deserialize)]
struct NumericAttributeSection {
    key: String,
    min_value: i64,
    max_value: i64,
    #[serde(default)]
    invert_match: bool,
}

#[derive(Serialize, Deserialize)]
struct BooleanAttributeSection {
    key: String,
    value: bool,
    #[serde(default)]
    invert_match: bool,
}

#[derive(Serialize, Deserialize)]
struct LatencySection {
    threshold_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upper_threshold_ms: Option<u64>,
}

#[derive(Serialize, Deserialize)]
struct SpanCountSection {
    min_spans: u64,
    #[serde(default)]
    max_spans: u64,
}

#[derive(Serialize, Deserialize)]
struct TraceStateSection {
    key: String,
    values: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct OttlConditionSection {
    #[serde(default)]
    error_mode: ErrorMode,
    #[serde(default, alias = "span_conditions")]
    span: Vec<String>,
    #[serde(default, alias = "span_event_conditions")]
    spanevent: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct AndSection {
    and_sub_policy: Vec<RawPolicy>,
}

#[derive(Serialize, Deserialize)]
struct DropSection {
    drop_sub_policy: Vec<RawPolicy>,
}

#[derive(Serialize, Deserialize)]
struct CompositeSection {
    #[serde(default)]
    operator: CompositeOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_total_spans_per_second: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    policy_order: Vec<String>,
    composite_sub_policy: Vec<RawPolicy>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    rate_allocation: Vec<RateAllocation>,
}

fn decode_all(raw: Vec<RawPolicy>) -> Result<Vec<Policy>> {
    raw.into_iter().map(decode_policy).collect()
}

fn decode_policy(raw: RawPolicy) -> Result<Policy> {
    let RawPolicy {
        name,
        policy_type,
        mut sections,
    } = raw;
    let name = name.ok_or_else(|| Error::MissingField("name".to_string()))?;
    let policy_type = policy_type.ok_or_else(|| Error::MissingField(format!("{name}.type")))?;

    let sections = &mut sections;
    let kind = match policy_type.as_str() {
        "always_sample" => PolicyKind::AlwaysSample,
        "probabilistic" => {
            let s: ProbabilisticSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::Probabilistic(ProbabilisticConfig {
                sampling_percentage: s.sampling_percentage,
                hash_salt: s.hash_salt,
            })
        }
        "rate_limiting" => {
            let s: RateLimitingSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::RateLimiting(RateLimitingConfig {
                spans_per_second: s.spans_per_second,
            })
        }
        "status_code" => {
            let s: StatusCodeSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::StatusCode(StatusCodeConfig {
                status_codes: s.status_codes,
            })
        }
        "string_attribute" => {
            let s: StringAttributeSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::StringAttribute(StringAttributeConfig {
                key: s.key,
                values: s.values,
                enabled_regex_matching: s.enabled_regex_matching,
                cache_max_size: s.cache_max_size,
                invert_match: s.invert_match,
            })
        }
        "numeric_attribute" => {
            let s: NumericAttributeSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::NumericAttribute(NumericAttributeConfig {
                key: s.key,
                min_value: s.min_value,
                max_value: s.max_value,
                invert_match: s.invert_match,
            })
        }
        "boolean_attribute" => {
            let s: BooleanAttributeSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::BooleanAttribute(BooleanAttributeConfig {
                key: s.key,
                value: s.value,
                invert_match: s.invert_match,
            })
        }
        "latency" => {
            let s: LatencySection = take_section(&name, &policy_type, sections)?;
            PolicyKind::Latency(LatencyConfig {
                threshold_ms: s.threshold_ms,
                upper_threshold_ms: s.upper_threshold_ms,
            })
        }
        "span_count" => {
            let s: SpanCountSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::SpanCount(SpanCountConfig {
                min_spans: s.min_spans,
                max_spans: s.max_spans,
            })
        }
        "trace_state" => {
            let s: TraceStateSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::TraceState(TraceStateConfig {
                key: s.key,
                values: s.values,
            })
        }
        "ottl_condition" => {
            let s: OttlConditionSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::OttlCondition(OttlConditionConfig {
                error_mode: s.error_mode,
                span_conditions: s.span,
                span_event_conditions: s.spanevent,
            })
        }
        "and" => {
            let s: AndSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::And(AndConfig {
                sub_policies: decode_all(s.and_sub_policy)?,
            })
        }
        "drop" => {
            let s: DropSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::Drop(DropConfig {
                sub_policies: decode_all(s.drop_sub_policy)?,
            })
        }
        "composite" => {
            let s: CompositeSection = take_section(&name, &policy_type, sections)?;
            PolicyKind::Composite(CompositeConfig {
                operator: s.operator,
                max_total_spans_per_second: s.max_total_spans_per_second,
                policy_order: s.policy_order,
                rate_allocation: s.rate_allocation,
                sub_policies: decode_all(s.composite_sub_policy)?,
            })
        }
        other => {
            return Err(Error::UnknownPolicyType {
                policy: name,
                policy_type: other.to_string(),
            })
        }
    };

    debug!("Parsed policy '{}' ({})", name, policy_type);
    Ok(Policy::new(name, kind))
}

fn take_section<T: DeserializeOwned>(
    policy: &str,
    policy_type: &str,
    sections: &mut BTreeMap<String, Value>,
) -> Result<T> {
    let section = sections
        .remove(policy_type)
        .ok_or_else(|| Error::MissingPolicyConfig {
            policy: policy.to_string(),
            policy_type: policy_type.to_string(),
        })?;

    serde_yaml::from_value(section).map_err(|e| Error::Parse {
        reason: format!("policy '{policy}': {e}"),
    })
}

fn encode_all(policies: &[Policy]) -> Result<Vec<RawPolicy>> {
    policies.iter().map(encode_policy).collect()
}

fn encode_policy(policy: &Policy) -> Result<RawPolicy> {
    let section = match &policy.kind {
        PolicyKind::AlwaysSample => None,
        PolicyKind::Probabilistic(c) => Some(serde_yaml::to_value(ProbabilisticSection {
            sampling_percentage: c.sampling_percentage,
            hash_salt: c.hash_salt.clone(),
        })?),
        PolicyKind::RateLimiting(c) => Some(serde_yaml::to_value(RateLimitingSection {
            spans_per_second: c.spans_per_second,
        })?),
        PolicyKind::StatusCode(c) => Some(serde_yaml::to_value(StatusCodeSection {
            status_codes: c.status_codes.clone(),
        })?),
        PolicyKind::StringAttribute(c) => Some(serde_yaml::to_value(StringAttributeSection {
            key: c.key.clone(),
            values: c.values.clone(),
            enabled_regex_matching: c.enabled_regex_matching,
            cache_max_size: c.cache_max_size,
            invert_match: c.invert_match,
        })?),
        PolicyKind::NumericAttribute(c) => Some(serde_yaml::to_value(NumericAttributeSection {
            key: c.key.clone(),
            min_value: c.min_value,
            max_value: c.max_value,
            invert_match: c.invert_match,
        })?),
        PolicyKind::BooleanAttribute(c) => Some(serde_yaml::to_value(BooleanAttributeSection {
            key: c.key.clone(),
            value: c.value,
            invert_match: c.invert_match,
        })?),
        PolicyKind::Latency(c) => Some(serde_yaml::to_value(LatencySection {
            threshold_ms: c.threshold_ms,
            upper_threshold_ms: c.upper_threshold_ms,
        })?),
        PolicyKind::SpanCount(c) => Some(serde_yaml::to_value(SpanCountSection {
            min_spans: c.min_spans,
            max_spans: c.max_spans,
        })?),
        PolicyKind::TraceState(c) => Some(serde_yaml::to_value(TraceStateSection {
            key: c.key.clone(),
            values: c.values.clone(),
        })?),
        PolicyKind::OttlCondition(c) => Some(serde_yaml::to_value(OttlConditionSection {
            error_mode: c.error_mode,
            span: c.span_conditions.clone(),
            spanevent: c.span_event_conditions.clone(),
        })?),
        PolicyKind::And(c) => Some(serde_yaml::to_value(AndSection {
            and_sub_policy: encode_all(&c.sub_policies)?,
        })?),
        PolicyKind::Drop(c) => Some(serde_yaml::to_value(DropSection {
            drop_sub_policy: encode_all(&c.sub_policies)?,
        })?),
        PolicyKind::Composite(c) => Some(serde_yaml::to_value(CompositeSection {
            operator: c.operator,
            max_total_spans_per_second: c.max_total_spans_per_second,
            policy_order: c.policy_order.clone(),
            composite_sub_policy: encode_all(&c.sub_policies)?,
            rate_allocation: c.rate_allocation.clone(),
        })?),
    };

    let mut sections = BTreeMap::new();
    if let Some(section) = section {
        sections.insert(policy.type_name().to_string(), section);
    }

    Ok(RawPolicy {
        name: Some(policy.name.clone()),
        policy_type: Some(policy.type_name().to_string()),
        sections,
    })
}
