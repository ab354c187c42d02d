//! Typed policy model.
//!
//! A [`Policy`] is plain configuration data: a name plus one of the fourteen
//! [`PolicyKind`] variants. JSON documents use camelCase fields and are tagged by
//! `type`, e.g. `{"name": "errors", "type": "status_code", "statusCodes": ["ERROR"]}`.

use otail_trace::StatusCode;
use serde::{Deserialize, Serialize};

/// A named sampling policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    /// Policy name, unique among siblings.
    pub name: String,
    /// What the policy does.
    #[serde(flatten)]
    pub kind: PolicyKind,
}

/// The policy variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyKind {
    /// Samples every trace.
    AlwaysSample,
    /// Samples a deterministic percentage of trace ids.
    Probabilistic(ProbabilisticConfig),
    /// Caps admitted spans per second.
    RateLimiting(RateLimitingConfig),
    /// Matches span status codes.
    StatusCode(StatusCodeConfig),
    /// Matches string attributes, exactly or by regex.
    StringAttribute(StringAttributeConfig),
    /// Matches numeric attributes within a range.
    NumericAttribute(NumericAttributeConfig),
    /// Matches boolean attributes.
    BooleanAttribute(BooleanAttributeConfig),
    /// Matches traces by overall duration.
    Latency(LatencyConfig),
    /// Matches traces by span count.
    SpanCount(SpanCountConfig),
    /// Matches W3C trace-state entries.
    TraceState(TraceStateConfig),
    /// Delegates to OTTL conditions.
    OttlCondition(OttlConditionConfig),
    /// Samples when every sub-policy samples.
    And(AndConfig),
    /// Vetoes the trace when every sub-policy samples.
    Drop(DropConfig),
    /// First-match sub-policies sharing a span budget.
    Composite(CompositeConfig),
}

/// Settings for `probabilistic`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbabilisticConfig {
    /// Percentage of traces to sample, `0..=100`.
    pub sampling_percentage: f64,
    /// Salt mixed into the trace id hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_salt: Option<String>,
}

/// Settings for `rate_limiting`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitingConfig {
    /// Spans admitted per second.
    pub spans_per_second: u64,
}

/// Settings for `status_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCodeConfig {
    /// Status codes that match.
    pub status_codes: Vec<StatusCode>,
}

/// Settings for `string_attribute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringAttributeConfig {
    /// Attribute key.
    pub key: String,
    /// Values that match.
    pub values: Vec<String>,
    /// Treat `values` as regular expressions.
    #[serde(default)]
    pub enabled_regex_matching: bool,
    /// Capacity of the regex result cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_max_size: Option<usize>,
    /// Invert the match.
    #[serde(default)]
    pub invert_match: bool,
}

/// Settings for `numeric_attribute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericAttributeConfig {
    /// Attribute key.
    pub key: String,
    /// Inclusive lower bound.
    pub min_value: i64,
    /// Inclusive upper bound.
    pub max_value: i64,
    /// Invert the match.
    #[serde(default)]
    pub invert_match: bool,
}

/// Settings for `boolean_attribute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BooleanAttributeConfig {
    /// Attribute key.
    pub key: String,
    /// Value that matches.
    pub value: bool,
    /// Invert the match.
    #[serde(default)]
    pub invert_match: bool,
}

/// Settings for `latency`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatencyConfig {
    /// Minimum duration in milliseconds.
    pub threshold_ms: u64,
    /// Upper bound; `None` or `0` means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_threshold_ms: Option<u64>,
}

/// Settings for `span_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanCountConfig {
    /// Minimum span count.
    pub min_spans: u64,
    /// Upper bound; `0` means unbounded.
    #[serde(default)]
    pub max_spans: u64,
}

/// Settings for `trace_state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStateConfig {
    /// Trace-state entry key.
    pub key: String,
    /// Entry values that match.
    pub values: Vec<String>,
}

/// Settings for `ottl_condition`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OttlConditionConfig {
    /// How condition failures are reported.
    #[serde(default)]
    pub error_mode: ErrorMode,
    /// Conditions evaluated per span.
    #[serde(default)]
    pub span_conditions: Vec<String>,
    /// Conditions evaluated per span event.
    #[serde(default)]
    pub span_event_conditions: Vec<String>,
}

/// How condition evaluation failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMode {
    /// The policy decides `Error`.
    Propagate,
    /// The failure is logged and treated as no match.
    #[default]
    Ignore,
    /// The failure is treated as no match without logging.
    Silent,
}

/// Settings for `and`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndConfig {
    /// Child policies, in declaration order.
    pub sub_policies: Vec<Policy>,
}

/// Settings for `drop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropConfig {
    /// Child policies, in declaration order.
    pub sub_policies: Vec<Policy>,
}

/// Settings for `composite`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeConfig {
    /// How sub-policies are combined.
    #[serde(default)]
    pub operator: CompositeOperator,
    /// Span budget shared by every sub-policy. `None` or `0` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_total_spans_per_second: Option<u64>,
    /// Evaluation order by sub-policy name; unnamed sub-policies follow.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_order: Vec<String>,
    /// Per sub-policy budget shares.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rate_allocation: Vec<RateAllocation>,
    /// Child policies, in declaration order.
    pub sub_policies: Vec<Policy>,
}

/// How a composite combines its sub-policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeOperator {
    /// First sampling sub-policy wins.
    #[default]
    Or,
    /// Every sub-policy must sample.
    And,
}

/// Share of a composite's budget reserved for one sub-policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateAllocation {
    /// Sub-policy name.
    pub policy: String,
    /// Percentage of `maxTotalSpansPerSecond`.
    pub percent: u32,
}

impl Policy {
    /// Creates a policy.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: PolicyKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Creates an `always_sample` policy.
    #[must_use]
    pub fn always_sample(name: impl Into<String>) -> Self {
        Self::new(name, PolicyKind::AlwaysSample)
    }

    /// Returns the `type` tag of this policy.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Returns the direct sub-policies of `and`, `drop` and `composite` policies.
    #[must_use]
    pub fn sub_policies(&self) -> &[Policy] {
        match &self.kind {
            PolicyKind::And(config) => &config.sub_policies,
            PolicyKind::Drop(config) => &config.sub_policies,
            PolicyKind::Composite(config) => &config.sub_policies,
            _ => &[],
        }
    }
}

impl PolicyKind {
    /// Every `type` tag, in declaration order.
    pub const TYPE_NAMES: [&'static str; 14] = [
        "always_sample",
        "probabilistic",
        "rate_limiting",
        "status_code",
        "string_attribute",
        "numeric_attribute",
        "boolean_attribute",
        "latency",
        "span_count",
        "trace_state",
        "ottl_condition",
        "and",
        "drop",
        "composite",
    ];

    /// Returns the `type` tag of this variant.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::AlwaysSample => "always_sample",
            Self::Probabilistic(_) => "probabilistic",
            Self::RateLimiting(_) => "rate_limiting",
            Self::StatusCode(_) => "status_code",
            Self::StringAttribute(_) => "string_attribute",
            Self::NumericAttribute(_) => "numeric_attribute",
            Self::BooleanAttribute(_) => "boolean_attribute",
            Self::Latency(_) => "latency",
            Self::SpanCount(_) => "span_count",
            Self::TraceState(_) => "trace_state",
            Self::OttlCondition(_) => "ottl_condition",
            Self::And(_) => "and",
            Self::Drop(_) => "drop",
            Self::Composite(_) => "composite",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_tagged_by_type() {
        let policy = Policy::new(
            "slow",
            PolicyKind::Latency(LatencyConfig {
                threshold_ms: 500,
                upper_threshold_ms: None,
            }),
        );

        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "slow", "type": "latency", "thresholdMs": 500})
        );
    }

    #[test]
    fn nested_policies_deserialize() {
        let json = r#"{
            "name": "errors-from-checkout",
            "type": "and",
            "subPolicies": [
                {"name": "checkout", "type": "string_attribute", "key": "service.name", "values": ["checkout"]},
                {"name": "errors", "type": "status_code", "statusCodes": ["ERROR"]}
            ]
        }"#;

        let policy: Policy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.type_name(), "and");
        assert_eq!(policy.sub_policies().len(), 2);
        assert_eq!(
            policy.sub_policies()[1].kind,
            PolicyKind::StatusCode(StatusCodeConfig {
                status_codes: vec![StatusCode::Error]
            })
        );
    }

    #[test]
    fn optional_fields_default() {
        let json = r#"{"name": "c", "type": "composite", "subPolicies": []}"#;
        let policy: Policy = serde_json::from_str(json).unwrap();

        let PolicyKind::Composite(config) = policy.kind else {
            panic!("expected composite");
        };
        assert_eq!(config.operator, CompositeOperator::Or);
        assert_eq!(config.max_total_spans_per_second, None);
        assert!(config.rate_allocation.is_empty());

        let ottl: Policy =
            serde_json::from_str(r#"{"name": "o", "type": "ottl_condition"}"#).unwrap();
        let PolicyKind::OttlCondition(config) = ottl.kind else {
            panic!("expected ottl_condition");
        };
        assert_eq!(config.error_mode, ErrorMode::Ignore);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let result = serde_json::from_str::<Policy>(r#"{"name": "x", "type": "sometimes"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn type_names_cover_every_variant() {
        let policy = Policy::always_sample("a");
        assert_eq!(policy.type_name(), PolicyKind::TYPE_NAMES[0]);
        assert_eq!(PolicyKind::TYPE_NAMES.len(), 14);
    }
}
