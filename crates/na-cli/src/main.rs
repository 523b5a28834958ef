//! NanoAna CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod run;
mod summary;

#[derive(Parser)]
#[command(name = "nanoana")]
#[command(about = "NanoAna - NanoAOD event selection and histogramming")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an analysis job over JSON Lines event files
    Run {
        /// Job configuration (YAML, or JSON by extension)
        #[arg(short, long)]
        config: PathBuf,

        /// Stop after this many events (overrides the job file).
        #[arg(long)]
        max_events: Option<u64>,

        /// Histogram output file (overrides the job file).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize a histogram file
    Summary {
        /// Histogram file written by `run`
        #[arg(short, long)]
        input: PathBuf,

        /// Also summarize this response matrix (`<dir>/<name>`).
        #[arg(long)]
        response: Option<String>,

        /// Output file for the summary (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Run { config, max_events, output } => {
            let report = run::cmd_run(&config, max_events, output.as_ref())?;
            write_json(None, report)
        }
        Commands::Summary { input, response, output } => {
            let summary = summary::cmd_summary(&input, response.as_deref())?;
            write_json(output.as_ref(), summary)
        }
        Commands::Version => {
            println!("nanoana {}", na_core::VERSION);
            Ok(())
        }
    }
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
