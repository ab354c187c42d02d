//! Composite policies: ordered sub-policies under a shared span budget.
//!
//! The composite owns one shared [`TokenBucket`] sized by
//! `max_total_spans_per_second` plus one bucket per sub-policy that has a rate
//! allocation. A trace is admitted only if both the shared bucket and the
//! deciding sub-policy's bucket can pay for its spans.

use crate::bucket::TokenBucket;
use crate::decision::Decision;
use crate::error::{Error, Result};
use crate::evaluator::PolicyEvaluator;
use crate::predicate::get_span_count;
use otail_policy::{CompositeConfig, CompositeOperator};
use otail_trace::Trace;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug)]
struct Child {
    evaluator: PolicyEvaluator,
    budget: Option<TokenBucket>,
}

/// Evaluates sub-policies in order under a shared span budget.
///
/// With [`CompositeOperator::Or`] the first sampling sub-policy whose own
/// allocation still has room decides. With [`CompositeOperator::And`] every
/// sub-policy must sample and only the shared budget is charged. A child
/// [`Decision::Error`] is returned as is.
#[derive(Debug)]
pub struct CompositeEvaluator {
    operator: CompositeOperator,
    shared: Option<TokenBucket>,
    children: Vec<Child>,
}

impl CompositeEvaluator {
    /// Creates the evaluator over children built in declaration order.
    ///
    /// Children named in `policy_order` run first, in that order, followed by
    /// the rest in declaration order. A rate allocation of `percent` reserves
    /// that share of the shared budget; `0` reserves an equal share. Sub-policies
    /// without an allocation are limited by the shared budget alone.
    ///
    /// # Errors
    ///
    /// Returns an error if an allocation or order entry names no sub-policy,
    /// or if allocations add up to more than 100 percent.
    pub fn new(
        policy: &str,
        config: &CompositeConfig,
        children: Vec<PolicyEvaluator>,
    ) -> Result<Self> {
        let known = |name: &str| children.iter().any(|child| child.name() == name);

        let mut total_percent: u32 = 0;
        for allocation in &config.rate_allocation {
            if !known(allocation.policy.as_str()) {
                return Err(Error::UnknownRateAllocationPolicy {
                    policy: policy.to_string(),
                    sub_policy: allocation.policy.clone(),
                });
            }
            total_percent = total_percent.saturating_add(allocation.percent);
        }
        if total_percent > 100 {
            return Err(Error::RateAllocationOverflow {
                policy: policy.to_string(),
                total: total_percent,
            });
        }

        if let Some(name) = config.policy_order.iter().find(|name| !known(name.as_str())) {
            return Err(Error::UnknownPolicyOrderEntry {
                policy: policy.to_string(),
                sub_policy: name.clone(),
            });
        }

        let max_total = config.max_total_spans_per_second.filter(|&rate| rate > 0);
        let budgets = allocation_rates(policy, config, max_total, children.len());

        let mut children: Vec<Child> = children
            .into_iter()
            .map(|evaluator| Child {
                budget: budgets.get(evaluator.name()).copied().map(TokenBucket::new),
                evaluator,
            })
            .collect();
        children.sort_by_key(|child| {
            config
                .policy_order
                .iter()
                .position(|name| name == child.evaluator.name())
                .unwrap_or(usize::MAX)
        });

        Ok(Self {
            operator: config.operator,
            shared: max_total.map(TokenBucket::new),
            children,
        })
    }

    /// The operator combining sub-policies.
    pub const fn operator(&self) -> CompositeOperator {
        self.operator
    }

    /// Sub-policy names in evaluation order.
    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.children.iter().map(|child| child.evaluator.name())
    }

    /// Evaluates the trace at `now_ns`.
    pub fn evaluate(&mut self, trace: &Trace, now_ns: u64) -> Decision {
        let spans = u64::try_from(get_span_count(trace)).unwrap_or(u64::MAX);
        match self.operator {
            CompositeOperator::Or => self.evaluate_or(trace, spans, now_ns),
            CompositeOperator::And => self.evaluate_and(trace, spans, now_ns),
        }
    }

    fn evaluate_or(&mut self, trace: &Trace, spans: u64, now_ns: u64) -> Decision {
        for child in &mut self.children {
            match child.evaluator.evaluate(trace, now_ns) {
                Decision::Sampled => {}
                Decision::Error => return Decision::Error,
                _ => continue,
            }

            if let Some(budget) = &mut child.budget {
                if !budget.has(spans, now_ns) {
                    debug!(
                        "Sub-policy '{}' matched but its allocation is spent",
                        child.evaluator.name()
                    );
                    continue;
                }
            }

            if !charge(self.shared.as_mut(), spans, now_ns) {
                return Decision::NotSampled;
            }
            if let Some(budget) = &mut child.budget {
                budget.try_consume(spans, now_ns);
            }
            return Decision::Sampled;
        }

        Decision::NotSampled
    }

    fn evaluate_and(&mut self, trace: &Trace, spans: u64, now_ns: u64) -> Decision {
        for child in &mut self.children {
            match child.evaluator.evaluate(trace, now_ns) {
                Decision::Sampled => {}
                Decision::Error => return Decision::Error,
                _ => return Decision::NotSampled,
            }
        }
        Decision::from_match(charge(self.shared.as_mut(), spans, now_ns))
    }
}

/// Charges the shared budget; an unlimited budget always pays.
fn charge(shared: Option<&mut TokenBucket>, spans: u64, now_ns: u64) -> bool {
    match shared {
        Some(bucket) => bucket.try_consume(spans, now_ns),
        None => true,
    }
}

fn allocation_rates(
    policy: &str,
    config: &CompositeConfig,
    max_total: Option<u64>,
    child_count: usize,
) -> HashMap<String, u64> {
    let Some(max_total) = max_total else {
        return HashMap::new();
    };
    let equal_share = max_total / u64::try_from(child_count.max(1)).unwrap_or(u64::MAX);

    config
        .rate_allocation
        .iter()
        .map(|allocation| {
            let rate = if allocation.percent > 0 {
                max_total.saturating_mul(u64::from(allocation.percent)) / 100
            } else {
                debug!(
                    "Policy '{}' gives sub-policy '{}' an equal share of {} spans/s",
                    policy, allocation.policy, equal_share
                );
                equal_share
            };
            (allocation.policy.clone(), rate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluators::testing::{deciding, trace, Spy};
    use otail_policy::RateAllocation;

    fn config(
        operator: CompositeOperator,
        max_total: Option<u64>,
        order: &[&str],
        allocations: &[(&str, u32)],
    ) -> CompositeConfig {
        CompositeConfig {
            operator,
            max_total_spans_per_second: max_total,
            policy_order: order.iter().map(ToString::to_string).collect(),
            rate_allocation: allocations
                .iter()
                .map(|(policy, percent)| RateAllocation {
                    policy: (*policy).to_string(),
                    percent: *percent,
                })
                .collect(),
            sub_policies: Vec::new(),
        }
    }

    #[test]
    fn shared_budget_exhaustion() {
        // trace() has 2 spans; a budget of 4 admits two traces per second.
        let mut eval = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::Or, Some(4), &[], &[]),
            vec![deciding("miss", Decision::NotSampled), deciding("hit", Decision::Sampled)],
        )
        .unwrap();

        assert_eq!(eval.evaluate(&trace(), 0), Decision::Sampled);
        assert_eq!(eval.evaluate(&trace(), 0), Decision::Sampled);
        assert_eq!(eval.evaluate(&trace(), 0), Decision::NotSampled);
        assert_eq!(eval.evaluate(&trace(), 1_000_000_000), Decision::Sampled);
    }

    #[test]
    fn unlimited_without_budget() {
        for max_total in [None, Some(0)] {
            let mut eval = CompositeEvaluator::new(
                "c",
                &config(CompositeOperator::Or, max_total, &[], &[("hit", 10)]),
                vec![deciding("hit", Decision::Sampled)],
            )
            .unwrap();

            for _ in 0..100 {
                assert_eq!(eval.evaluate(&trace(), 0), Decision::Sampled);
            }
        }
    }

    #[test]
    fn policy_order_runs_first() {
        let first = Spy::matching(true);
        let second = Spy::matching(true);
        let eval = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::Or, None, &["second"], &[]),
            vec![first.evaluator("first"), second.evaluator("second")],
        );
        let mut eval = eval.unwrap();

        assert_eq!(eval.order().collect::<Vec<_>>(), vec!["second", "first"]);
        assert_eq!(eval.evaluate(&trace(), 0), Decision::Sampled);
        assert_eq!(second.calls(), 1);
        assert_eq!(first.calls(), 0);
    }

    #[test]
    fn spent_allocation_falls_through_to_next_match() {
        // 50% of 4 spans/s: "a" can admit one 2-span trace per second.
        let mut eval = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::Or, Some(4), &[], &[("a", 50)]),
            vec![deciding("a", Decision::Sampled), deciding("b", Decision::Sampled)],
        )
        .unwrap();

        assert_eq!(eval.evaluate(&trace(), 0), Decision::Sampled); // via a
        assert_eq!(eval.evaluate(&trace(), 0), Decision::Sampled); // via b
        assert_eq!(eval.evaluate(&trace(), 0), Decision::NotSampled);
    }

    #[test]
    fn spent_allocation_without_fallback() {
        let mut eval = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::Or, Some(8), &[], &[("a", 25)]),
            vec![deciding("a", Decision::Sampled), deciding("b", Decision::NotSampled)],
        )
        .unwrap();

        assert_eq!(eval.evaluate(&trace(), 0), Decision::Sampled);
        assert_eq!(eval.evaluate(&trace(), 0), Decision::NotSampled);
    }

    #[test]
    fn zero_percent_gets_an_equal_share() {
        // 8 spans/s split across two children leaves 4 for "a".
        let mut eval = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::Or, Some(8), &[], &[("a", 0)]),
            vec![deciding("a", Decision::Sampled), deciding("b", Decision::NotSampled)],
        )
        .unwrap();

        assert_eq!(eval.evaluate(&trace(), 0), Decision::Sampled);
        assert_eq!(eval.evaluate(&trace(), 0), Decision::Sampled);
        assert_eq!(eval.evaluate(&trace(), 0), Decision::NotSampled);
    }

    #[test]
    fn child_errors_propagate() {
        let mut eval = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::Or, None, &[], &[]),
            vec![deciding("bad", Decision::Error), deciding("hit", Decision::Sampled)],
        )
        .unwrap();

        assert_eq!(eval.evaluate(&trace(), 0), Decision::Error);
    }

    #[test]
    fn inverted_children_do_not_decide() {
        let mut eval = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::Or, None, &[], &[]),
            vec![
                deciding("veto", Decision::InvertNotSampled),
                deciding("pass", Decision::InvertSampled),
            ],
        )
        .unwrap();

        assert_eq!(eval.evaluate(&trace(), 0), Decision::NotSampled);
    }

    #[test]
    fn and_operator_requires_every_child() {
        let mut all = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::And, Some(2), &[], &[]),
            vec![deciding("a", Decision::Sampled), deciding("b", Decision::Sampled)],
        )
        .unwrap();
        let mut one_misses = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::And, None, &[], &[]),
            vec![deciding("a", Decision::Sampled), deciding("b", Decision::NotSampled)],
        )
        .unwrap();

        assert_eq!(all.operator(), CompositeOperator::And);
        assert_eq!(all.evaluate(&trace(), 0), Decision::Sampled);
        assert_eq!(all.evaluate(&trace(), 0), Decision::NotSampled);
        assert_eq!(one_misses.evaluate(&trace(), 0), Decision::NotSampled);
    }

    #[test]
    fn rejects_bad_allocations() {
        let unknown = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::Or, Some(10), &[], &[("ghost", 10)]),
            vec![deciding("a", Decision::Sampled)],
        );
        let overflow = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::Or, Some(10), &[], &[("a", 60), ("b", 50)]),
            vec![deciding("a", Decision::Sampled), deciding("b", Decision::Sampled)],
        );
        let bad_order = CompositeEvaluator::new(
            "c",
            &config(CompositeOperator::Or, None, &["ghost"], &[]),
            vec![deciding("a", Decision::Sampled)],
        );

        assert!(matches!(
            unknown,
            Err(Error::UnknownRateAllocationPolicy { sub_policy, .. }) if sub_policy == "ghost"
        ));
        assert!(matches!(overflow, Err(Error::RateAllocationOverflow { total: 110, .. })));
        assert!(matches!(bad_order, Err(Error::UnknownPolicyOrderEntry { .. })));
    }
}
