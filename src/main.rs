use std::process::ExitCode;

use clap::Parser;

use trialdesk::adapter::inbound::cli::command::Cli;
use trialdesk::adapter::inbound::cli::{output, run};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
