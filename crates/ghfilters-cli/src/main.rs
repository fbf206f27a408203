//! create-github-gmail-filters entry point.

use std::process::ExitCode;

use clap::Parser;

use ghfilters_cli::{Cli, ClientConfig, ClientResult, RunSummary, Settings};
use ghfilters_core::{LogConfig, LogFormat, init_logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = if cli.debug {
        LogConfig::debug()
    } else {
        LogConfig::default()
    };
    if cli.json_logs {
        log_config = log_config.with_format(LogFormat::Json);
    }
    if let Err(e) = init_logging(&log_config) {
        eprintln!("warning: {}", e);
    }

    match run(&cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> ClientResult<RunSummary> {
    let config = ClientConfig::load(cli.config.as_deref())?;
    let settings = Settings::resolve(cli, &config)?;
    ghfilters_cli::run(&settings).await
}
