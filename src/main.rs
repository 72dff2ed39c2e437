use anyhow::Result;
use clap::{Parser, Subcommand};
use econbase::{
    config::PipelineConfig,
    pipeline::{run_baseline, run_ingest, IngestSummary},
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "econbase",
    about = "Normalize economic-statistics tables and map them into a canonical baseline"
)]
struct Cli {
    /// Pipeline configuration file.
    #[arg(short, long, default_value = "config/pipeline.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reshape raw documents into interim pools.
    Ingest {
        /// Only ingest this release (default: all configured releases).
        #[arg(long)]
        release: Option<String>,
    },
    /// Apply the mapping rules to the configured pool and write the baseline.
    Build,
    /// Ingest every release, then build the baseline.
    Run,
}

fn main() {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = PipelineConfig::load(&cli.config)?;
    info!(config = %cli.config.display(), "loaded pipeline config");

    match cli.command {
        Command::Ingest { release } => {
            let summaries = ingest(&config, release.as_deref())?;
            print_summary(&summaries)
        }
        Command::Build => print_summary(&run_baseline(&config)?),
        Command::Run => {
            ingest(&config, None)?;
            print_summary(&run_baseline(&config)?)
        }
    }
}

fn ingest(config: &PipelineConfig, only: Option<&str>) -> Result<Vec<IngestSummary>> {
    let releases = match only {
        Some(name) => vec![config.release(name)?],
        None => config.releases.iter().collect(),
    };
    releases
        .into_iter()
        .map(|release| run_ingest(config, release))
        .collect()
}

fn print_summary<T: Serialize>(summary: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
