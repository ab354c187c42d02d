//! Otail CLI - tail-sampling policy evaluation engine.
//!
//! Commands:
//! - `otail evaluate` - Decide traces against a policy configuration
//! - `otail validate` - Check that a configuration builds
//! - `otail simulate` - Replay many traces on a simulated clock
//! - `otail export` - Convert a configuration between collector YAML and JSON

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ExportFormat, OutputFormat};

#[derive(Parser)]
#[command(name = "otail")]
#[command(about = "Tail-sampling policy evaluation engine for OpenTelemetry pipelines")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the policy configuration (collector YAML or JSON)
    #[arg(
        short,
        long,
        global = true,
        env = "OTAIL_CONFIG",
        default_value = "otelcol.yaml"
    )]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide one or more traces
    Evaluate {
        /// Trace file or directory of trace files
        #[arg(short, long)]
        trace: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Evaluation clock in Unix nanoseconds (defaults to now)
        #[arg(long)]
        now_ns: Option<u64>,
    },

    /// Parse and build every policy without evaluating
    Validate,

    /// Replay traces through one sampler on a simulated clock
    Simulate {
        /// Trace file or directory; synthetic traces are generated if omitted
        #[arg(short, long)]
        traces: Option<String>,

        /// Number of synthetic traces
        #[arg(long, default_value_t = 1000)]
        count: usize,

        /// Seed for synthetic traces
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Simulated time between traces, in milliseconds
        #[arg(long, default_value_t = 10)]
        interval_ms: u64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Rewrite the configuration in another format
    Export {
        /// Target format
        #[arg(long, value_enum, default_value_t = ExportFormat::Yaml)]
        to: ExportFormat,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Evaluate {
            trace,
            format,
            now_ns,
        } => commands::evaluate::run(&cli.config, &trace, format, now_ns),
        Commands::Validate => commands::validate::run(&cli.config),
        Commands::Simulate {
            traces,
            count,
            seed,
            interval_ms,
            format,
            output,
        } => commands::simulate::run(&commands::simulate::SimulateArgs {
            config_path: &cli.config,
            traces_path: traces.as_deref(),
            count,
            seed,
            interval_ms,
            format,
            output_path: output.as_deref(),
        }),
        Commands::Export { to, output } => {
            commands::export::run(&cli.config, to, output.as_deref())
        }
    }
}
