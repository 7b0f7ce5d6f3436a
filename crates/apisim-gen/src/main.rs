//! # apisim-gen
//!
//! Command-line driver that turns an OpenAPI document into a stateful API
//! simulator using an external coding agent.
//!
//! ```bash
//! apisim-gen slack.yaml -o slack-sim --max-attempts 2 --timeout-secs 900
//! apisim-gen slack.yaml --dry-run -v
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use apisim_gen::{
    CommandAgent, Generator, GeneratorOptions, PipelineOptions, DEFAULT_AGENT_COMMAND,
    DEFAULT_MAX_ATTEMPTS, DEFAULT_OUTPUT_DIR,
};
use clap::Parser;
use tracing::error;

/// Generate an API simulator from an OpenAPI specification.
#[derive(Debug, Parser)]
#[command(name = "apisim-gen", version, about)]
struct Cli {
    /// OpenAPI specification (.yaml, .yml or .json).
    spec: PathBuf,

    /// Directory to generate the simulator into.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Log debug output.
    #[arg(short, long)]
    verbose: bool,

    /// Agent command line; the prompt is appended as the last argument.
    #[arg(long, env = "APISIM_AGENT_COMMAND", default_value = DEFAULT_AGENT_COMMAND)]
    agent_command: String,

    /// Attempts per step before giving up.
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Kill the agent after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Plan and report the steps without running them.
    #[arg(long)]
    dry_run: bool,
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut agent = match CommandAgent::from_command_line(&cli.agent_command) {
        Ok(agent) => agent,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(secs) = cli.timeout_secs {
        agent = agent.with_timeout(Duration::from_secs(secs));
    }

    let options = GeneratorOptions {
        spec_path: cli.spec,
        output_dir: cli.output,
        pipeline: PipelineOptions {
            max_attempts: cli.max_attempts,
            dry_run: cli.dry_run,
        },
    };
    let output_dir = options.output_dir.clone();

    match Generator::new(options, agent).run().await {
        Ok(generation) if generation.report.is_success() => {
            println!("\n{}", "=".repeat(50));
            println!("✅ API Simulation Generated Successfully!");
            println!("\nNext steps:");
            println!("cd {}", output_dir.display());
            println!("Follow README.md to install dependencies and start the server");
            println!("\nThe API will be available at http://localhost:5000");
            println!("Database will be stored in data/database.db");
            ExitCode::SUCCESS
        }
        Ok(generation) => {
            for id in &generation.report.failed {
                let reason = generation
                    .plan
                    .task(id)
                    .and_then(|t| t.last_error.as_deref())
                    .unwrap_or("unknown error");
                eprintln!("❌ {id} failed: {reason}");
            }
            if !generation.report.skipped.is_empty() {
                eprintln!("Skipped: {}", generation.report.skipped.join(", "));
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("❌ Generation failed: {e}");
            ExitCode::FAILURE
        }
    }
}
