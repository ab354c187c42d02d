//! Hash-based probabilistic sampling.

use crate::decision::Decision;
use crate::error::{Error, Result};
use otail_policy::ProbabilisticConfig;
use otail_trace::Trace;
use tracing::warn;

/// Salt used when a policy does not configure one.
pub const DEFAULT_HASH_SALT: &str = "default-hash-seed";

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Samples a stable fraction of trace ids.
///
/// The trace id is hashed together with the salt using 32-bit FNV-1a, the
/// same hash the collector's probabilistic filter uses, so every evaluator with
/// the same salt and percentage agrees on every trace.
#[derive(Debug, Clone)]
pub struct ProbabilisticEvaluator {
    salt: String,
    threshold: Threshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Threshold {
    Never,
    AtMost(u32),
    Always,
}

impl ProbabilisticEvaluator {
    /// Creates the evaluator.
    ///
    /// # Errors
    ///
    /// Returns an error if the percentage is not within `[0, 100]`.
    pub fn new(policy: &str, config: &ProbabilisticConfig) -> Result<Self> {
        let percentage = config.sampling_percentage;
        if !(0.0..=100.0).contains(&percentage) {
            return Err(Error::InvalidSamplingPercentage {
                policy: policy.to_string(),
                percentage,
            });
        }

        let salt = match config.hash_salt.as_deref() {
            Some(salt) if !salt.is_empty() => salt.to_string(),
            _ => DEFAULT_HASH_SALT.to_string(),
        };

        Ok(Self {
            salt,
            threshold: threshold(percentage),
        })
    }

    /// Evaluates the trace.
    pub fn evaluate(&self, trace: &Trace) -> Decision {
        match self.threshold {
            Threshold::Never => Decision::NotSampled,
            Threshold::Always => Decision::Sampled,
            Threshold::AtMost(limit) => {
                let Some(trace_id) = trace.effective_trace_id() else {
                    warn!("Trace has no id, probabilistic sampling skipped");
                    return Decision::NotSampled;
                };
                Decision::from_match(hash_trace_id(&self.salt, trace_id) <= limit)
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn threshold(percentage: f64) -> Threshold {
    if percentage <= 0.0 {
        Threshold::Never
    } else if percentage >= 100.0 {
        Threshold::Always
    } else {
        Threshold::AtMost((f64::from(u32::MAX) * percentage / 100.0).floor() as u32)
    }
}

/// Hashes `salt` followed by the trace id bytes with 32-bit FNV-1a.
///
/// Ids that are valid hex once dashes are removed are hashed as the decoded
/// bytes, anything else as its UTF-8 bytes.
pub fn hash_trace_id(salt: &str, trace_id: &str) -> u32 {
    let compact: String = trace_id.chars().filter(|&c| c != '-').collect();
    let id_bytes = hex::decode(&compact).unwrap_or_else(|_| trace_id.as_bytes().to_vec());

    salt.as_bytes()
        .iter()
        .chain(&id_bytes)
        .fold(FNV_OFFSET_BASIS, |hash, &byte| {
            (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use otail_trace::Span;
    use proptest::prelude::*;

    fn eval(percentage: f64, salt: Option<&str>) -> ProbabilisticEvaluator {
        ProbabilisticEvaluator::new(
            "p",
            &ProbabilisticConfig {
                sampling_percentage: percentage,
                hash_salt: salt.map(ToString::to_string),
            },
        )
        .unwrap()
    }

    fn trace(id: &str) -> Trace {
        Trace::from_spans(id, vec![Span::new("a", "op")])
    }

    #[test]
    fn rejects_out_of_range_percentages() {
        for percentage in [-1.0, 100.5, f64::NAN] {
            let result = ProbabilisticEvaluator::new(
                "p",
                &ProbabilisticConfig {
                    sampling_percentage: percentage,
                    hash_salt: None,
                },
            );
            assert!(matches!(result, Err(Error::InvalidSamplingPercentage { .. })));
        }
    }

    #[test]
    fn hash_is_fnv1a_32() {
        // FNV-1a("") and FNV-1a("foobar"); "626172" is "bar" in hex.
        assert_eq!(hash_trace_id("", ""), 0x811c_9dc5);
        assert_eq!(hash_trace_id("foo", "626172"), 0xbf9c_f968);
        assert_eq!(hash_trace_id("a", ""), 0xe40c_292c);
    }

    #[test]
    fn threshold_is_inclusive() {
        assert_eq!(threshold(50.0), Threshold::AtMost(0x7fff_ffff));
        assert_eq!(threshold(0.0), Threshold::Never);
        assert_eq!(threshold(100.0), Threshold::Always);

        let id = "0af7651916cd43dd8448eb211c80319c";
        let hash = hash_trace_id(DEFAULT_HASH_SALT, id);
        let exact = ProbabilisticEvaluator {
            salt: DEFAULT_HASH_SALT.to_string(),
            threshold: Threshold::AtMost(hash),
        };
        let below = ProbabilisticEvaluator {
            salt: DEFAULT_HASH_SALT.to_string(),
            threshold: Threshold::AtMost(hash.wrapping_sub(1)),
        };

        assert_eq!(exact.evaluate(&trace(id)), Decision::Sampled);
        assert_eq!(below.evaluate(&trace(id)), Decision::NotSampled);
    }

    #[test]
    fn hex_ids_hash_as_bytes() {
        assert_eq!(
            hash_trace_id("s", "0af7651916cd43dd8448eb211c80319c"),
            hash_trace_id("s", "0af76519-16cd-43dd-8448-eb211c80319c"),
        );
        assert_ne!(hash_trace_id("s", "abcd"), hash_trace_id("s", "not-hex"));
        assert_ne!(hash_trace_id("a", "abcd"), hash_trace_id("b", "abcd"));
    }

    #[test]
    fn empty_salt_uses_default() {
        assert_eq!(eval(50.0, Some("")).salt, DEFAULT_HASH_SALT);
        assert_eq!(eval(50.0, None).salt, DEFAULT_HASH_SALT);
        assert_eq!(eval(50.0, Some("tenant")).salt, "tenant");
    }

    #[test]
    fn rate_is_roughly_honored() {
        let eval = eval(25.0, None);
        let sampled = (0..4_000)
            .filter(|i| eval.evaluate(&trace(&format!("{i:032x}"))).is_sampled())
            .count();

        assert!((800..1_200).contains(&sampled), "sampled {sampled} of 4000");
    }

    #[test]
    fn missing_trace_id_is_not_sampled() {
        assert_eq!(eval(50.0, None).evaluate(&Trace::new("")), Decision::NotSampled);
    }

    proptest! {
        #[test]
        fn zero_never_samples(id in "[0-9a-f]{32}") {
            prop_assert_eq!(eval(0.0, None).evaluate(&trace(&id)), Decision::NotSampled);
        }

        #[test]
        fn hundred_always_samples(id in "[0-9a-f]{32}") {
            prop_assert_eq!(eval(100.0, None).evaluate(&trace(&id)), Decision::Sampled);
        }

        #[test]
        fn decisions_are_stable(
            id in "[0-9a-zA-Z-]{1,40}",
            salt in proptest::option::of("[a-z]{0,8}"),
            percentage in 0.0f64..=100.0,
        ) {
            let first = eval(percentage, salt.as_deref());
            let second = eval(percentage, salt.as_deref());
            let t = trace(&id);

            prop_assert_eq!(first.evaluate(&t), first.evaluate(&t));
            prop_assert_eq!(first.evaluate(&t), second.evaluate(&t));
        }
    }
}
