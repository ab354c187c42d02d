//! Export command implementation.

use super::{load_config, write_output, ExportFormat};
use anyhow::{Context, Result};
use otail_policy::TailSamplingConfig;
use tracing::info;

/// Runs the export command.
pub fn run(config_path: &str, to: ExportFormat, output_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    let output = render(&config, to)?;

    info!("Exported {} policies as {:?}", config.policies.len(), to);
    write_output(&output, output_path)
}

/// Renders the config. YAML keeps the processor settings; JSON carries policies only.
fn render(config: &TailSamplingConfig, to: ExportFormat) -> Result<String> {
    match to {
        ExportFormat::Yaml => config.to_yaml().context("Failed to render collector YAML"),
        ExportFormat::Json => {
            let mut json = otail_policy::to_json(&config.policies)
                .context("Failed to render JSON policies")?;
            json.push('\n');
            Ok(json)
        }
    }
}
