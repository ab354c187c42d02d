//! Simulate command implementation.

use super::{build_sampler, load_policies, load_traces, write_output, OutputFormat};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use otail_sampling::{SimulationConfig, SimulationResult, Simulator};
use otail_trace::fixtures::{FixtureConfig, FixtureGenerator};
use std::fmt::Write;
use tracing::info;

const NANOS_PER_SEC: u64 = 1_000_000_000;
const NANOS_PER_MILLI: u64 = 1_000_000;

/// Arguments of the simulate command.
pub struct SimulateArgs<'a> {
    pub config_path: &'a str,
    pub traces_path: Option<&'a str>,
    pub count: usize,
    pub seed: u64,
    pub interval_ms: u64,
    pub format: OutputFormat,
    pub output_path: Option<&'a str>,
}

/// Runs the simulate command.
pub fn run(args: &SimulateArgs<'_>) -> Result<()> {
    let policies = load_policies(args.config_path)?;
    let sampler = build_sampler(&policies)?;

    let interval_ns = args.interval_ms.saturating_mul(NANOS_PER_MILLI);
    let fixtures = FixtureConfig::default()
        .with_seed(args.seed)
        .with_count(args.count)
        .with_interval_ns(interval_ns);

    let traces = match args.traces_path {
        Some(path) => load_traces(path)?,
        None => {
            info!(
                "Generating {} synthetic traces (seed {})",
                args.count, args.seed
            );
            FixtureGenerator::new(fixtures.clone()).generate()
        }
    };

    let config = SimulationConfig::default()
        .with_start_ns(fixtures.start_time_ns)
        .with_step_ns(interval_ns);
    let result = Simulator::new(sampler, config).run(&traces);

    let report = match args.format {
        OutputFormat::Text => render_text(&result),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&result)
                .context("Failed to serialize simulation")?;
            json.push('\n');
            json
        }
        OutputFormat::Csv => render_csv(&result)?,
    };
    write_output(&report, args.output_path)
}

fn render_text(result: &SimulationResult) -> String {
    let summary = &result.summary;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "traces: {} sampled of {} ({:.1}%)",
        summary.sampled_traces,
        summary.total_traces,
        summary.sample_rate() * 100.0
    );
    let _ = writeln!(
        out,
        "spans:  {} sampled of {}",
        summary.sampled_spans, summary.total_spans
    );
    for (decision, count) in &summary.final_decisions {
        let _ = writeln!(out, "  {decision}: {count}");
    }

    let _ = writeln!(out, "policies:");
    for (policy, decisions) in &summary.policy_decisions {
        let counts: Vec<String> = decisions
            .iter()
            .map(|(decision, count)| format!("{decision}={count}"))
            .collect();
        let _ = writeln!(out, "  {policy}: {}", counts.join(" "));
    }
    out
}

fn render_csv(result: &SimulationResult) -> Result<String> {
    let policy_names: Vec<&str> = result
        .summary
        .policy_decisions
        .keys()
        .map(String::as_str)
        .collect();
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["index", "trace_id", "span_count", "time", "final_decision"];
    header.extend(&policy_names);
    writer.write_record(&header)?;

    for row in &result.rows {
        let mut record = vec![
            row.index.to_string(),
            row.trace_id.clone(),
            row.span_count.to_string(),
            format_time(row.now_ns),
            row.result.final_decision.to_string(),
        ];
        record.extend(policy_names.iter().map(|name| {
            row.result
                .policy_decisions
                .get(*name)
                .map_or_else(String::new, ToString::to_string)
        }));
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn format_time(now_ns: u64) -> String {
    let secs = i64::try_from(now_ns / NANOS_PER_SEC).unwrap_or(i64::MAX);
    let nanos = u32::try_from(now_ns % NANOS_PER_SEC).unwrap_or_default();
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map_or_else(|| now_ns.to_string(), |time| time.to_rfc3339_opts(SecondsFormat::Nanos, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use otail_policy::Policy;
    use otail_sampling::Sampler;

    fn simulate(count: usize) -> SimulationResult {
        let sampler = Sampler::from_policies(&[Policy::always_sample("always")]).unwrap();
        let traces = FixtureGenerator::new(FixtureConfig::default().with_count(count)).generate();
        Simulator::new(sampler, SimulationConfig::default()).run(&traces)
    }

    #[test]
    fn formats_times_as_rfc3339() {
        assert_eq!(format_time(1_700_000_000_000_000_000), "2023-11-14T22:13:20.000000000Z");
    }

    #[test]
    fn csv_row_per_trace() {
        let csv = render_csv(&simulate(3)).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "index,trace_id,span_count,time,final_decision,always");
        assert!(lines[1].starts_with("0,"));
        assert!(lines[1].ends_with(",Sampled,Sampled"));
    }

    #[test]
    fn text_summary() {
        let text = render_text(&simulate(4));

        assert!(text.starts_with("traces: 4 sampled of 4 (100.0%)\n"));
        assert!(text.contains("  always: Sampled=4\n"));
    }
}
