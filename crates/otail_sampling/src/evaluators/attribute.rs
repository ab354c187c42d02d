//! Attribute matchers: boolean, numeric and string.
//!
//! All three test resource attributes and span attributes with the same
//! predicate. With `invert_match`, an absent attribute passes and any
//! resource or span whose attribute matches vetoes the trace.

use crate::decision::Decision;
use crate::error::{Error, Result};
use crate::predicate::{has_attribute_with_condition, invert_has_attribute_with_condition};
use lru::LruCache;
use otail_policy::{BooleanAttributeConfig, NumericAttributeConfig, StringAttributeConfig};
use otail_trace::{AttributeValue, Attributes, Trace};
use regex::Regex;
use std::collections::HashSet;
use std::num::NonZeroUsize;
use tracing::debug;

const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(size) => size,
    None => unreachable!(),
};

fn evaluate_attribute(
    trace: &Trace,
    key: &str,
    invert: bool,
    mut matches: impl FnMut(&AttributeValue) -> bool,
) -> Decision {
    if invert {
        invert_has_attribute_with_condition(trace, |attrs: &Attributes| {
            !attrs.get(key).is_some_and(&mut matches)
        })
    } else {
        has_attribute_with_condition(trace, |attrs: &Attributes| {
            attrs.get(key).is_some_and(&mut matches)
        })
    }
}

/// Matches a boolean attribute.
#[derive(Debug, Clone)]
pub struct BooleanAttributeEvaluator {
    key: String,
    value: bool,
    invert: bool,
}

impl BooleanAttributeEvaluator {
    /// Creates the evaluator.
    #[must_use]
    pub fn new(config: &BooleanAttributeConfig) -> Self {
        Self {
            key: config.key.clone(),
            value: config.value,
            invert: config.invert_match,
        }
    }

    /// Evaluates the trace.
    pub fn evaluate(&self, trace: &Trace) -> Decision {
        evaluate_attribute(trace, &self.key, self.invert, |value| {
            value.as_bool() == Some(self.value)
        })
    }
}

/// Matches an integer or float attribute within an inclusive range.
#[derive(Debug, Clone)]
pub struct NumericAttributeEvaluator {
    key: String,
    min: i64,
    max: i64,
    invert: bool,
}

impl NumericAttributeEvaluator {
    /// Creates the evaluator.
    ///
    /// # Errors
    ///
    /// Returns an error if `min_value > max_value`.
    pub fn new(policy: &str, config: &NumericAttributeConfig) -> Result<Self> {
        if config.min_value > config.max_value {
            return Err(Error::InvalidNumericRange {
                policy: policy.to_string(),
                min: config.min_value,
                max: config.max_value,
            });
        }
        Ok(Self {
            key: config.key.clone(),
            min: config.min_value,
            max: config.max_value,
            invert: config.invert_match,
        })
    }

    /// Evaluates the trace.
    pub fn evaluate(&self, trace: &Trace) -> Decision {
        evaluate_attribute(trace, &self.key, self.invert, |value| self.in_range(value))
    }

    #[allow(clippy::cast_precision_loss)]
    fn in_range(&self, value: &AttributeValue) -> bool {
        match value {
            AttributeValue::Int(v) => (self.min..=self.max).contains(v),
            other => other
                .as_f64()
                .is_some_and(|v| (self.min as f64..=self.max as f64).contains(&v)),
        }
    }
}

#[derive(Debug)]
enum StringMatcher {
    Exact(HashSet<String>),
    Regex {
        patterns: Vec<Regex>,
        cache: LruCache<String, bool>,
    },
}

/// Matches an attribute, coerced to a string, against literal values or regexes.
#[derive(Debug)]
pub struct StringAttributeEvaluator {
    key: String,
    matcher: StringMatcher,
    invert: bool,
}

impl StringAttributeEvaluator {
    /// Creates the evaluator.
    ///
    /// Empty values are ignored. In regex mode, match results are cached per
    /// attribute value in an LRU of `cache_max_size` entries (128 if unset).
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern does not compile.
    pub fn new(policy: &str, config: &StringAttributeConfig) -> Result<Self> {
        let values = config.values.iter().filter(|v| !v.is_empty());

        let matcher = if config.enabled_regex_matching {
            let patterns = values
                .map(|pattern| {
                    Regex::new(pattern).map_err(|source| Error::InvalidRegex {
                        policy: policy.to_string(),
                        pattern: pattern.clone(),
                        source,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let capacity = config
                .cache_max_size
                .and_then(NonZeroUsize::new)
                .unwrap_or(DEFAULT_CACHE_SIZE);
            debug!(
                "Policy '{}' compiled {} patterns, cache size {}",
                policy,
                patterns.len(),
                capacity
            );
            StringMatcher::Regex {
                patterns,
                cache: LruCache::new(capacity),
            }
        } else {
            StringMatcher::Exact(values.cloned().collect())
        };

        Ok(Self {
            key: config.key.clone(),
            matcher,
            invert: config.invert_match,
        })
    }

    /// Evaluates the trace.
    pub fn evaluate(&mut self, trace: &Trace) -> Decision {
        let matcher = &mut self.matcher;
        evaluate_attribute(trace, &self.key, self.invert, |value| {
            matcher.matches(&value.as_string())
        })
    }
}

impl StringMatcher {
    fn matches(&mut self, value: &str) -> bool {
        match self {
            Self::Exact(values) => values.contains(value),
            Self::Regex { patterns, cache } => {
                if let Some(&hit) = cache.get(value) {
                    return hit;
                }
                let matched = patterns.iter().any(|re| re.is_match(value));
                cache.put(value.to_string(), matched);
                matched
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otail_trace::{ResourceSpan, Span};

    fn span_with(key: &str, value: impl Into<AttributeValue>) -> Trace {
        Trace::from_spans("t", vec![Span::new("a", "op").with_attribute(key, value)])
    }

    fn numeric(min: i64, max: i64, invert: bool) -> NumericAttributeEvaluator {
        NumericAttributeEvaluator::new(
            "n",
            &NumericAttributeConfig {
                key: "x".to_string(),
                min_value: min,
                max_value: max,
                invert_match: invert,
            },
        )
        .unwrap()
    }

    fn string(values: &[&str], regex: bool, invert: bool) -> StringAttributeEvaluator {
        StringAttributeEvaluator::new(
            "s",
            &StringAttributeConfig {
                key: "service.name".to_string(),
                values: values.iter().map(ToString::to_string).collect(),
                enabled_regex_matching: regex,
                cache_max_size: Some(2),
                invert_match: invert,
            },
        )
        .unwrap()
    }

    #[test]
    fn numeric_range() {
        let eval = numeric(10, 20, false);

        assert_eq!(eval.evaluate(&span_with("x", 15i64)), Decision::Sampled);
        assert_eq!(eval.evaluate(&span_with("x", 10i64)), Decision::Sampled);
        assert_eq!(eval.evaluate(&span_with("x", 20i64)), Decision::Sampled);
        assert_eq!(eval.evaluate(&span_with("x", 25i64)), Decision::NotSampled);
        assert_eq!(eval.evaluate(&span_with("x", 12.5)), Decision::Sampled);
        assert_eq!(eval.evaluate(&span_with("x", "15")), Decision::NotSampled);
        assert_eq!(eval.evaluate(&span_with("y", 15i64)), Decision::NotSampled);
    }

    #[test]
    fn numeric_range_rejects_inverted_bounds() {
        let result = NumericAttributeEvaluator::new(
            "n",
            &NumericAttributeConfig {
                key: "x".to_string(),
                min_value: 5,
                max_value: 1,
                invert_match: false,
            },
        );
        assert!(matches!(result, Err(Error::InvalidNumericRange { min: 5, max: 1, .. })));
    }

    #[test]
    fn numeric_invert() {
        let eval = numeric(10, 20, true);

        assert_eq!(eval.evaluate(&span_with("x", 15i64)), Decision::InvertNotSampled);
        assert_eq!(eval.evaluate(&span_with("x", 25i64)), Decision::InvertSampled);
        assert_eq!(eval.evaluate(&span_with("y", 15i64)), Decision::InvertSampled);
    }

    #[test]
    fn boolean_matches_resource_or_span() {
        let eval = BooleanAttributeEvaluator::new(&BooleanAttributeConfig {
            key: "retry".to_string(),
            value: true,
            invert_match: false,
        });

        let on_resource = Trace::new("t").with_resource_span(
            ResourceSpan::new()
                .with_resource_attribute("retry", true)
                .with_spans(vec![Span::new("a", "op")]),
        );

        assert_eq!(eval.evaluate(&span_with("retry", true)), Decision::Sampled);
        assert_eq!(eval.evaluate(&on_resource), Decision::Sampled);
        assert_eq!(eval.evaluate(&span_with("retry", false)), Decision::NotSampled);
        assert_eq!(eval.evaluate(&span_with("retry", "true")), Decision::NotSampled);
    }

    #[test]
    fn string_exact() {
        let mut eval = string(&["checkout", ""], false, false);

        assert_eq!(eval.evaluate(&span_with("service.name", "checkout")), Decision::Sampled);
        assert_eq!(eval.evaluate(&span_with("service.name", "check")), Decision::NotSampled);
        assert_eq!(eval.evaluate(&span_with("service.name", "")), Decision::NotSampled);
    }

    #[test]
    fn string_coerces_non_strings() {
        let mut eval = StringAttributeEvaluator::new(
            "s",
            &StringAttributeConfig {
                key: "http.status_code".to_string(),
                values: vec!["503".to_string()],
                enabled_regex_matching: false,
                cache_max_size: None,
                invert_match: false,
            },
        )
        .unwrap();

        assert_eq!(eval.evaluate(&span_with("http.status_code", 503i64)), Decision::Sampled);
    }

    #[test]
    fn string_regex_with_cache() {
        let mut eval = string(&["^cart-.*", "payments"], true, false);

        let cart = span_with("service.name", "cart-api");
        assert_eq!(eval.evaluate(&cart), Decision::Sampled);
        assert_eq!(eval.evaluate(&cart), Decision::Sampled);
        assert_eq!(eval.evaluate(&span_with("service.name", "legacy-payments")), Decision::Sampled);
        assert_eq!(eval.evaluate(&span_with("service.name", "checkout")), Decision::NotSampled);

        let StringMatcher::Regex { cache, .. } = &eval.matcher else {
            panic!("expected regex matcher");
        };
        assert_eq!(cache.cap().get(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn string_regex_is_unanchored() {
        let mut eval = string(&["cart"], true, false);

        assert_eq!(eval.evaluate(&span_with("service.name", "legacy-cart-api")), Decision::Sampled);
        assert_eq!(eval.evaluate(&span_with("service.name", "cart")), Decision::Sampled);
        assert_eq!(eval.evaluate(&span_with("service.name", "checkout")), Decision::NotSampled);

        let mut anchored = string(&["^cart$"], true, false);
        assert_eq!(anchored.evaluate(&span_with("service.name", "legacy-cart-api")), Decision::NotSampled);
    }

    #[test]
    fn string_invalid_regex() {
        let result = StringAttributeEvaluator::new(
            "s",
            &StringAttributeConfig {
                key: "k".to_string(),
                values: vec!["(unclosed".to_string()],
                enabled_regex_matching: true,
                cache_max_size: None,
                invert_match: false,
            },
        );
        assert!(matches!(result, Err(Error::InvalidRegex { .. })));
    }

    #[test]
    fn string_invert_vetoes_any_match() {
        let mut eval = string(&["health"], false, true);

        let mixed = Trace::from_spans(
            "t",
            vec![
                Span::new("a", "op").with_attribute("service.name", "api"),
                Span::new("b", "op").with_attribute("service.name", "health"),
            ],
        );

        assert_eq!(eval.evaluate(&mixed), Decision::InvertNotSampled);
        assert_eq!(eval.evaluate(&span_with("service.name", "api")), Decision::InvertSampled);
        assert_eq!(eval.evaluate(&span_with("other", "health")), Decision::InvertSampled);
    }
}
