use std::process::ExitCode;

use tracing::error;
use tracing_subscriber::EnvFilter;
use viewer::{ViewerConfig, run_headless};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match ViewerConfig::load() {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    match run_headless(&config).await {
        Ok(report) if report.all_failed() => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "startup failed");
            ExitCode::FAILURE
        }
    }
}
