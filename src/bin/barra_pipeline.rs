use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use barra::pipeline::{self, PipelineConfig};

/// Runs the bond back-office pipeline against the helper reader/writer processes.
#[derive(Debug, Parser)]
#[command(name = "barra_pipeline")]
struct Args {
    /// TOML config overriding the default ports and file names
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host the helper processes listen on
    #[arg(long)]
    host: Option<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("PIPELINE: bad configuration: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    match pipeline::run(&config) {
        Ok(report) => {
            info!(
                "PIPELINE: done ({} trades, {} books, {} prices, {} inquiries)",
                report.trades, report.order_books, report.prices, report.inquiries
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("PIPELINE: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    Ok(config)
}
