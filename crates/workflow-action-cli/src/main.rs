use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "WFA_LOG";

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = workflow_action_cli::Cli::parse();
    match workflow_action_cli::run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let envelope = workflow_action_cli::error_envelope(&err);
            match serde_json::to_string(&envelope) {
                Ok(line) => eprintln!("{line}"),
                Err(_) => eprintln!("{err:#}"),
            }
            ExitCode::FAILURE
        }
    }
}
