//! Replays traces through a [`Sampler`] on a simulated clock.
//!
//! Trace `i` is decided at `start_ns + i * step_ns`, so rate-limited policies
//! see a steady arrival rate regardless of the traces' own timestamps.

use crate::combinator::{DecisionResult, Sampler};
use crate::decision::Decision;
use otail_trace::Trace;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Simulated clock settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Clock value for the first trace.
    pub start_ns: u64,
    /// Clock advance between traces.
    pub step_ns: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_ns: 0,
            step_ns: 10_000_000,
        }
    }
}

impl SimulationConfig {
    /// Sets the first clock value.
    #[must_use]
    pub const fn with_start_ns(mut self, start_ns: u64) -> Self {
        self.start_ns = start_ns;
        self
    }

    /// Sets the clock advance between traces.
    #[must_use]
    pub const fn with_step_ns(mut self, step_ns: u64) -> Self {
        self.step_ns = step_ns;
        self
    }

    /// Clock value for the trace at `index`.
    pub fn now_ns(&self, index: usize) -> u64 {
        let index = u64::try_from(index).unwrap_or(u64::MAX);
        self.start_ns
            .saturating_add(index.saturating_mul(self.step_ns))
    }
}

/// One simulated trace.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationRow {
    /// Position in the input.
    pub index: usize,
    /// Trace id.
    pub trace_id: String,
    /// Spans in the trace.
    pub span_count: usize,
    /// Clock value the trace was decided at.
    pub now_ns: u64,
    /// The decision.
    #[serde(flatten)]
    pub result: DecisionResult,
}

/// Totals over a simulation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    /// Traces decided.
    pub total_traces: usize,
    /// Traces sampled.
    pub sampled_traces: usize,
    /// Spans decided.
    pub total_spans: usize,
    /// Spans in sampled traces.
    pub sampled_spans: usize,
    /// Final decisions by kind.
    pub final_decisions: BTreeMap<Decision, usize>,
    /// Per policy, how often it returned each decision.
    pub policy_decisions: BTreeMap<String, BTreeMap<Decision, usize>>,
}

impl SimulationSummary {
    /// Fraction of traces sampled, or zero when nothing ran.
    #[allow(clippy::cast_precision_loss)]
    pub fn sample_rate(&self) -> f64 {
        if self.total_traces == 0 {
            0.0
        } else {
            self.sampled_traces as f64 / self.total_traces as f64
        }
    }

    fn record(&mut self, row: &SimulationRow) {
        self.total_traces += 1;
        self.total_spans += row.span_count;
        if row.result.final_decision.is_sampled() {
            self.sampled_traces += 1;
            self.sampled_spans += row.span_count;
        }
        *self
            .final_decisions
            .entry(row.result.final_decision)
            .or_default() += 1;
        for (policy, decision) in &row.result.policy_decisions {
            *self
                .policy_decisions
                .entry(policy.clone())
                .or_default()
                .entry(*decision)
                .or_default() += 1;
        }
    }
}

/// Result of a simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    /// Per-trace rows, in input order.
    pub rows: Vec<SimulationRow>,
    /// Totals.
    pub summary: SimulationSummary,
}

/// Drives a [`Sampler`] through a sequence of traces.
#[derive(Debug)]
pub struct Simulator {
    sampler: Sampler,
    config: SimulationConfig,
}

impl Simulator {
    /// Creates a simulator owning `sampler`.
    pub const fn new(sampler: Sampler, config: SimulationConfig) -> Self {
        Self { sampler, config }
    }

    /// Decides every trace in order.
    pub fn run(&mut self, traces: &[Trace]) -> SimulationResult {
        let mut summary = SimulationSummary::default();
        let rows: Vec<SimulationRow> = traces
            .iter()
            .enumerate()
            .map(|(index, trace)| {
                let now_ns = self.config.now_ns(index);
                let row = SimulationRow {
                    index,
                    trace_id: trace.trace_id.clone(),
                    span_count: trace.span_count(),
                    now_ns,
                    result: self.sampler.make_decision(trace, now_ns),
                };
                summary.record(&row);
                row
            })
            .collect();

        info!(
            "Simulated {} traces: {} sampled ({} of {} spans)",
            summary.total_traces, summary.sampled_traces, summary.sampled_spans, summary.total_spans
        );

        SimulationResult { rows, summary }
    }

    /// Returns the sampler, with whatever budget state the run left behind.
    pub fn into_sampler(self) -> Sampler {
        self.sampler
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otail_policy::{Policy, PolicyKind, RateLimitingConfig, StatusCodeConfig};
    use otail_trace::fixtures::{FixtureConfig, FixtureGenerator};
    use otail_trace::StatusCode;

    const SECOND: u64 = 1_000_000_000;

    fn traces(count: usize) -> Vec<Trace> {
        FixtureGenerator::new(FixtureConfig::default().with_count(count)).generate()
    }

    #[test]
    fn clock_advances_per_trace() {
        let config = SimulationConfig::default().with_start_ns(5).with_step_ns(10);
        assert_eq!(config.now_ns(0), 5);
        assert_eq!(config.now_ns(3), 35);
        assert_eq!(config.with_step_ns(u64::MAX).now_ns(2), u64::MAX);
    }

    #[test]
    fn counts_decisions() {
        let sampler = Sampler::from_policies(&[
            Policy::new(
                "errors",
                PolicyKind::StatusCode(StatusCodeConfig {
                    status_codes: vec![StatusCode::Error],
                }),
            ),
            Policy::always_sample("always"),
        ])
        .unwrap();
        let input = traces(50);
        let mut simulator = Simulator::new(sampler, SimulationConfig::default());

        let result = simulator.run(&input);
        let summary = &result.summary;

        assert_eq!(result.rows.len(), 50);
        assert_eq!(summary.total_traces, 50);
        assert_eq!(summary.sampled_traces, 50);
        assert_eq!(summary.sampled_spans, summary.total_spans);
        assert!((summary.sample_rate() - 1.0).abs() < f64::EPSILON);
        assert_eq!(summary.policy_decisions["always"][&Decision::Sampled], 50);

        let errors = &summary.policy_decisions["errors"];
        assert_eq!(errors.values().sum::<usize>(), 50);
        assert_eq!(result.rows[1].now_ns, 10_000_000);
    }

    #[test]
    fn rate_limit_follows_the_simulated_clock() {
        let policies = [Policy::new(
            "budget",
            PolicyKind::RateLimiting(RateLimitingConfig { spans_per_second: 10 }),
        )];
        let input = traces(40);
        let total_spans: usize = input.iter().map(Trace::span_count).sum();

        // Everything arrives within the same instant: only the initial burst fits.
        let mut burst = Simulator::new(
            Sampler::from_policies(&policies).unwrap(),
            SimulationConfig::default().with_step_ns(0),
        );
        let burst = burst.run(&input).summary;
        assert!(burst.sampled_spans <= 10);

        // One trace per second refills the bucket before every trace.
        let mut spread = Simulator::new(
            Sampler::from_policies(&policies).unwrap(),
            SimulationConfig::default().with_step_ns(SECOND),
        );
        let spread = spread.run(&input).summary;
        assert_eq!(spread.sampled_spans, total_spans);
    }

    #[test]
    fn empty_run() {
        let mut simulator = Simulator::new(
            Sampler::from_policies(&[]).unwrap(),
            SimulationConfig::default(),
        );
        let result = simulator.run(&[]);

        assert!(result.rows.is_empty());
        assert_eq!(result.summary, SimulationSummary::default());
        assert!(result.summary.sample_rate().abs() < f64::EPSILON);
        assert!(simulator.into_sampler().is_empty());
    }
}
