//! Command implementations and the helpers they share.

pub mod evaluate;
pub mod export;
pub mod simulate;
pub mod validate;

use anyhow::{Context, Result};
use clap::ValueEnum;
use otail_policy::{Policy, TailSamplingConfig};
use otail_sampling::{Builder, Sampler, UnavailableConditions};
use otail_trace::{loader, Trace};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Pretty-printed JSON.
    Json,
    /// One CSV row per trace.
    Csv,
}

/// Configuration format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// Collector `tail_sampling` YAML.
    Yaml,
    /// JSON policy document.
    Json,
}

/// Reads the processor config from collector YAML, or policies from JSON when
/// the file ends in `.json`.
pub fn load_config(path: &str) -> Result<TailSamplingConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read config file: {path}"))?;

    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config = if is_json {
        TailSamplingConfig::new(
            otail_policy::parse_json(&content).with_context(|| "Failed to parse JSON policies")?,
        )
    } else {
        otail_policy::parse_config(&content)
            .with_context(|| "Failed to parse tail_sampling config")?
    };

    info!("Loaded {} policies from {}", config.policies.len(), path);
    Ok(config)
}

/// Reads only the policies of [`load_config`].
pub fn load_policies(path: &str) -> Result<Vec<Policy>> {
    Ok(load_config(path)?.policies)
}

/// Builds a sampler. OTTL conditions have no runtime here, so those policies
/// follow their error mode.
pub fn build_sampler(policies: &[Policy]) -> Result<Sampler> {
    let builder = Builder::new().with_condition_evaluator(Arc::new(UnavailableConditions));
    Sampler::with_builder(&builder, policies).with_context(|| "Failed to build policies")
}

/// Loads traces from a file or every `.json` file in a directory.
pub fn load_traces(path: &str) -> Result<Vec<Trace>> {
    let path = Path::new(path);
    if path.is_dir() {
        loader::load_directory(path)
            .with_context(|| format!("Failed to load traces from directory: {}", path.display()))
    } else {
        loader::load_traces(path)
            .with_context(|| format!("Failed to load trace file: {}", path.display()))
    }
}

/// Writes `content` to `output`, or stdout when none is given.
pub fn write_output(content: &str, output: Option<&str>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write output file: {path}"))?;
            info!("Output written to: {}", path);
        }
        None => print!("{content}"),
    }
    Ok(())
}
