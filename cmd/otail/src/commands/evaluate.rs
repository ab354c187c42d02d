//! Evaluate command implementation.

use super::{build_sampler, load_policies, load_traces, OutputFormat};
use anyhow::{Context, Result};
use chrono::Utc;
use otail_sampling::{Decision, DecisionResult};
use serde::Serialize;
use std::fmt::Write;
use tracing::{info, warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TraceDecision<'a> {
    trace_id: &'a str,
    #[serde(flatten)]
    result: &'a DecisionResult,
}

/// Runs the evaluate command.
pub fn run(
    config_path: &str,
    trace_path: &str,
    format: OutputFormat,
    now_ns: Option<u64>,
) -> Result<()> {
    let policies = load_policies(config_path)?;
    let mut sampler = build_sampler(&policies)?;
    let traces = load_traces(trace_path)?;

    let now_ns = now_ns.unwrap_or_else(current_time_ns);
    info!(
        "Evaluating {} trace(s) against {} policies at {}",
        traces.len(),
        sampler.len(),
        now_ns
    );

    let results: Vec<(String, DecisionResult)> = traces
        .iter()
        .map(|trace| (trace.trace_id.clone(), sampler.make_decision(trace, now_ns)))
        .collect();

    let errors = results
        .iter()
        .filter(|(_, result)| result.final_decision == Decision::Error)
        .count();
    if errors > 0 {
        warn!("{} trace(s) decided Error", errors);
    }

    let output = match format {
        OutputFormat::Text => render_text(&results),
        OutputFormat::Json => render_json(&results)?,
        OutputFormat::Csv => render_csv(&results, sampler.policy_names())?,
    };
    print!("{output}");
    Ok(())
}

fn current_time_ns() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .and_then(|ns| u64::try_from(ns).ok())
        .unwrap_or_default()
}

fn render_text(results: &[(String, DecisionResult)]) -> String {
    let mut out = String::new();
    for (trace_id, result) in results {
        let _ = writeln!(out, "trace {trace_id}: {}", result.final_decision);
        for (policy, decision) in &result.policy_decisions {
            let _ = writeln!(out, "  {policy}: {decision}");
        }
    }
    out
}

fn render_json(results: &[(String, DecisionResult)]) -> Result<String> {
    let rows: Vec<TraceDecision<'_>> = results
        .iter()
        .map(|(trace_id, result)| TraceDecision { trace_id, result })
        .collect();
    let mut json = serde_json::to_string_pretty(&rows).context("Failed to serialize results")?;
    json.push('\n');
    Ok(json)
}

fn render_csv<'a>(
    results: &[(String, DecisionResult)],
    policy_names: impl Iterator<Item = &'a str>,
) -> Result<String> {
    let policy_names: Vec<&str> = policy_names.collect();
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["trace_id", "final_decision"];
    header.extend(&policy_names);
    writer.write_record(&header)?;

    for (trace_id, result) in results {
        let mut record = vec![trace_id.as_str(), result.final_decision.as_str()];
        record.extend(policy_names.iter().map(|name| {
            result
                .policy_decisions
                .get(*name)
                .map_or("", |decision| decision.as_str())
        }));
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}
