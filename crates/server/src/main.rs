use clap::Parser as _;
use dras_server::config::Cli;
use dras_server::{app, logging};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level, cli.log_format);

    let config = match cli.into_config() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = app::run(config).await {
        tracing::error!(error = %e, "server exited with error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
